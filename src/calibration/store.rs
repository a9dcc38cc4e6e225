// CalibrationStore - JSON persistence for the fitted sensor model
//
// The record is written once by a calibration session and read once at
// monitor start. A record that decodes but breaks the schema is reported as
// malformed, never half-used.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calibration::fitter::{CalibrationModel, MIN_CALIBRATION_POINTS};
use crate::error::StoreError;

/// Human-readable formula stored next to the coefficients
pub const FORMULA: &str = "Force (N) = slope * Z-axis (mT) + intercept";

/// Timestamp format of the `generated` field
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persisted outcome of one calibration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Local time the record was generated
    pub generated: String,
    /// Points the operator entered, including ones that produced no samples
    pub num_calibration_points: usize,
    /// `None` serialises as `null`
    pub z_axis_sensor: Option<SensorCalibration>,
    pub sensor_config: SensorConfigRecord,
}

/// Fitted coefficients as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCalibration {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub formula: String,
    pub sensor_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfigRecord {
    pub z_axis_keyword: String,
}

impl From<&CalibrationModel> for SensorCalibration {
    fn from(model: &CalibrationModel) -> Self {
        Self {
            slope: model.slope,
            intercept: model.intercept,
            r_squared: model.r_squared,
            formula: FORMULA.to_string(),
            sensor_label: model.sensor_label.clone(),
        }
    }
}

impl From<&SensorCalibration> for CalibrationModel {
    fn from(sensor: &SensorCalibration) -> Self {
        Self {
            slope: sensor.slope,
            intercept: sensor.intercept,
            r_squared: sensor.r_squared,
            sensor_label: sensor.sensor_label.clone(),
        }
    }
}

impl CalibrationRecord {
    /// Build a record around a fitted model
    pub fn new(
        generated: impl Into<String>,
        num_calibration_points: usize,
        model: Option<&CalibrationModel>,
        z_axis_keyword: impl Into<String>,
    ) -> Self {
        Self {
            generated: generated.into(),
            num_calibration_points,
            z_axis_sensor: model.map(SensorCalibration::from),
            sensor_config: SensorConfigRecord {
                z_axis_keyword: z_axis_keyword.into(),
            },
        }
    }

    /// The usable model, if the record carries one
    pub fn model(&self) -> Option<CalibrationModel> {
        self.z_axis_sensor.as_ref().map(CalibrationModel::from)
    }

    /// Check the schema constraints serde can't express
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.num_calibration_points < MIN_CALIBRATION_POINTS {
            return Err(StoreError::Malformed {
                reason: format!(
                    "num_calibration_points is {}, expected at least {}",
                    self.num_calibration_points, MIN_CALIBRATION_POINTS
                ),
            });
        }

        if let Some(sensor) = &self.z_axis_sensor {
            for (name, value) in [
                ("slope", sensor.slope),
                ("intercept", sensor.intercept),
                ("r_squared", sensor.r_squared),
            ] {
                if !value.is_finite() {
                    return Err(StoreError::Malformed {
                        reason: format!("{} is not finite", name),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Current local time in the record's timestamp format
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Reads and writes one calibration record file
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// Write `record` as pretty JSON, replacing any previous file
    pub fn save(&self, record: &CalibrationRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, json).map_err(|err| StoreError::Io {
            path: self.display_path(),
            reason: err.to_string(),
        })?;

        tracing::info!("[Store] Calibration saved to {}", self.display_path());
        Ok(())
    }

    /// Read and validate the record
    ///
    /// # Returns
    /// * `Ok(CalibrationRecord)` - Decoded record satisfying the schema
    /// * `Err(StoreError::NotFound)` - No file at the path
    /// * `Err(StoreError::Io)` - File could not be read
    /// * `Err(StoreError::Malformed)` - Decode failure or schema violation
    pub fn load(&self) -> Result<CalibrationRecord, StoreError> {
        let contents = fs::read_to_string(&self.path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                path: self.display_path(),
            },
            _ => StoreError::Io {
                path: self.display_path(),
                reason: err.to_string(),
            },
        })?;

        let record: CalibrationRecord = serde_json::from_str(&contents)?;
        record.validate()?;
        Ok(record)
    }

    /// Read the record and extract its model
    ///
    /// A record with a `null` sensor is `StoreError::NoCalibration`.
    pub fn load_model(&self) -> Result<CalibrationModel, StoreError> {
        let record = self.load()?;
        let model = record.model().ok_or(StoreError::NoCalibration)?;
        tracing::info!(
            "[Store] Loaded calibration from {} (generated {}, {} points)",
            self.display_path(),
            record.generated,
            record.num_calibration_points
        );
        Ok(model)
    }
}
