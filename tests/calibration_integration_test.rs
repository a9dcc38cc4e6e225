//! Integration tests for the calibration and monitor workflow
//!
//! These tests drive both sessions end to end without hardware:
//! - Calibration against scripted and replayed sensor output
//! - Persisting the record and loading it back for monitoring
//! - Monitor ticks over a replayed capture

use std::io::Cursor;
use std::path::PathBuf;

use force_sensor::calibration::{CalibrationStore, KG_TO_NEWTONS};
use force_sensor::config::AppConfig;
use force_sensor::error::{CalibrationError, StoreError};
use force_sensor::session::{
    CalibrationSession, ConsoleOperator, JsonLinesDisplay, MonitorSession, StopReason,
};
use force_sensor::transport::{CancelToken, ReaderLineSource, ScriptedLineSource};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

fn fast_config(samples: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.calibration.samples_per_weight = samples;
    config.calibration.sample_delay_ms = 0;
    config.calibration.buffer_settle_ms = 0;
    config.monitor.refresh_interval_ms = 0;
    config
}

fn operator(input: &str) -> ConsoleOperator<Cursor<Vec<u8>>, Vec<u8>> {
    ConsoleOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

/// Calibrate from a replayed capture, save, then monitor with the result
#[test]
fn test_calibrate_then_monitor_from_replay() {
    let dir = TempDir::new().unwrap();
    let store = CalibrationStore::new(dir.path().join("calibration_data.json"));
    let config = fast_config(3);

    let source = ReaderLineSource::from_path(fixture("pico_calibration.log")).unwrap();
    let outcome = CalibrationSession::new(source, operator("0\n1\n2\ndone\n"), &config)
        .run(&store)
        .unwrap();

    assert_eq!(outcome.record.num_calibration_points, 3);
    let sensor = outcome.record.z_axis_sensor.as_ref().unwrap();
    assert!((sensor.slope - KG_TO_NEWTONS / 10.0).abs() < 1e-9);
    assert!((sensor.intercept + KG_TO_NEWTONS).abs() < 1e-9);
    assert!((sensor.r_squared - 1.0).abs() < 1e-9);
    assert_eq!(sensor.sensor_label, "M1");

    // The persisted model is exactly what was fitted
    let model = store.load_model().unwrap();
    assert_eq!(model.slope.to_bits(), sensor.slope.to_bits());
    assert_eq!(model.intercept.to_bits(), sensor.intercept.to_bits());

    let source = ReaderLineSource::from_path(fixture("pico_monitor.log")).unwrap();
    let mut session = MonitorSession::new(source, "Z-axis", model, config.monitor.clone());
    let mut display = JsonLinesDisplay::new(Vec::new());
    let reason = session
        .run(&mut display, &CancelToken::new(), None)
        .unwrap();

    assert_eq!(reason, StopReason::Closed);
    let output = String::from_utf8(display.into_inner()).unwrap();
    let frames: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(frames.len(), 5);

    // 5 mT and 10 mT are at or below the zero-load reading
    assert_eq!(frames[0]["force_newtons"], 0.0);
    assert!(frames[1]["force_newtons"].as_f64().unwrap().abs() < 1e-9);
    let last = frames[4]["force_newtons"].as_f64().unwrap();
    assert!((last - 1.5 * KG_TO_NEWTONS).abs() < 1e-9);
    assert!(frames[4]["force_axis_max"].as_f64().unwrap() > last);
}

#[test]
fn test_calibration_with_scripted_noise() {
    let dir = TempDir::new().unwrap();
    let store = CalibrationStore::new(dir.path().join("cal.json"));

    let mut source = ScriptedLineSource::new();
    source
        .push_line("Format: Z-axis(M1): X.XXX mT")
        .push_line("Z-axis(M1): 12.0 mT")
        .push_empty()
        .push_line("Z-axis(M1): 14.0 mT")
        .push_line("Z-axis(M1): ERROR")
        .push_line("Z-axis(M1): 22.0 mT")
        .push_line("Z-axis(M1): 24.0 mT");

    let outcome = CalibrationSession::new(source, operator("0.0\n0.5\n"), &fast_config(2))
        .run(&store)
        .unwrap();

    let table = outcome.procedure.table();
    assert_eq!(table[0].raw_mean, Some(13.0));
    assert_eq!(table[1].raw_mean, Some(23.0));
    let sensor = outcome.record.z_axis_sensor.unwrap();
    assert!((sensor.slope - 0.5 * KG_TO_NEWTONS / 10.0).abs() < 1e-9);
}

#[test]
fn test_failed_calibration_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cal.json");
    let store = CalibrationStore::new(&path);

    // Two weights, no readings at all
    let err = CalibrationSession::new(
        ScriptedLineSource::new(),
        operator("0\n1\ndone\n"),
        &fast_config(3),
    )
    .run(&store)
    .unwrap_err();

    assert_eq!(
        err.downcast_ref::<CalibrationError>(),
        Some(&CalibrationError::NoSamples { points: 2 })
    );
    assert!(!path.exists());
    assert!(matches!(
        store.load_model(),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn test_degenerate_readings_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = CalibrationStore::new(dir.path().join("cal.json"));
    let source = ScriptedLineSource::from_lines(["Z-axis: 7.0", "Z-axis: 7.0"]);

    let err = CalibrationSession::new(source, operator("0\n1\n"), &fast_config(1))
        .run(&store)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CalibrationError>(),
        Some(CalibrationError::DegenerateReadings { .. })
    ));
}
