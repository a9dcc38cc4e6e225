//! Configuration for the calibration and monitoring sessions
//!
//! Sensor keyword, serial port, sample counts and refresh rate live here and
//! are handed to each session at startup. Values can be overridden from a JSON
//! file; missing sections and fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sensor: SensorConfig,
    pub serial: SerialConfig,
    pub calibration: CalibrationConfig,
    pub monitor: MonitorConfig,
}

/// Which labelled measurement to pick out of the sensor stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Keyword preceding the Z-axis value, e.g. `Z-axis(M1): 12.693 mT`
    pub z_axis_keyword: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            z_axis_keyword: "Z-axis".to_string(),
        }
    }
}

/// Serial link to the microcontroller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Per-read timeout; a timeout is an empty read, not a fault
    pub read_timeout_ms: u64,
    /// Wait after opening the port before trusting the stream
    pub connect_settle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 115_200,
            read_timeout_ms: 1_000,
            connect_settle_ms: 2_000,
        }
    }
}

#[cfg(target_os = "windows")]
fn default_port() -> &'static str {
    "COM4"
}

#[cfg(not(target_os = "windows"))]
fn default_port() -> &'static str {
    "/dev/ttyACM0"
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn connect_settle(&self) -> Duration {
        Duration::from_millis(self.connect_settle_ms)
    }
}

/// Calibration session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Valid readings averaged per reference weight
    pub samples_per_weight: usize,
    /// Delay between accepted samples
    pub sample_delay_ms: u64,
    /// Delay after discarding buffered input, before the first sample
    pub buffer_settle_ms: u64,
    /// Where the calibration record is written
    pub output_path: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            samples_per_weight: 10,
            sample_delay_ms: 100,
            buffer_settle_ms: 200,
            output_path: PathBuf::from("calibration_data.json"),
        }
    }
}

impl CalibrationConfig {
    pub fn sample_delay(&self) -> Duration {
        Duration::from_millis(self.sample_delay_ms)
    }

    pub fn buffer_settle(&self) -> Duration {
        Duration::from_millis(self.buffer_settle_ms)
    }
}

/// Real-time monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Display refresh tick
    pub refresh_interval_ms: u64,
    /// Fixed full-scale value for the raw (mT) bar
    pub raw_axis_max: f64,
    /// Initial full-scale value for the force (N) bar
    pub initial_force_max: f64,
    /// Headroom applied when the force bar rescales
    pub autoscale_headroom: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 50,
            raw_axis_max: 50.0,
            initial_force_max: 1.0,
            autoscale_headroom: 1.1,
        }
    }
}

impl MonitorConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load from an optional path, using defaults when none is given
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::default(),
        }
    }
}
