// Force Sensor Host - calibration and live monitoring for a magnetometer load cell
// Text readings arrive over serial; a linear model maps them to newtons

// Module declarations
pub mod calibration;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use calibration::{CalibrationModel, CalibrationRecord, CalibrationStore};
pub use config::AppConfig;
pub use protocol::{extract, SensorReading};
pub use transport::{CancelToken, LineSource, ReadOutcome};

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber
///
/// Honours `RUST_LOG`; defaults to `info`. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }

    #[test]
    fn test_module_structure() {
        let model = CalibrationModel {
            slope: 2.0,
            intercept: 1.0,
            r_squared: 1.0,
            sensor_label: "M1".to_string(),
        };
        let reading = extract("Z-axis(M1): 4.000 mT", "Z-axis").unwrap();
        assert_eq!(calibration::estimate(reading.value, &model), 9.0);
    }
}
