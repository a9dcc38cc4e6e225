// Calibration store error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Store error code constants
///
/// Error code range: 3001-3004
pub struct StoreErrorCodes {}

impl StoreErrorCodes {
    /// Calibration file does not exist
    pub const NOT_FOUND: i32 = 3001;

    /// Calibration file exists but could not be read or written
    pub const IO: i32 = 3002;

    /// Calibration file does not decode or violates the schema
    pub const MALFORMED: i32 = 3003;

    /// Calibration file holds a null sensor model
    pub const NO_CALIBRATION: i32 = 3004;
}

/// Log a store error with structured context
pub fn log_store_error(err: &StoreError, context: &str) {
    error!(
        "Store error in {}: code={}, component=CalibrationStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration store errors
///
/// Every variant means "no usable calibration"; the monitor refuses to
/// start on any of them.
///
/// Error code range: 3001-3004
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No file at the configured path
    NotFound { path: String },

    /// Filesystem failure while reading or writing
    Io { path: String, reason: String },

    /// Decode failure or schema violation
    Malformed { reason: String },

    /// The record was written without a usable sensor model
    NoCalibration,
}

impl ErrorCode for StoreError {
    fn code(&self) -> i32 {
        match self {
            StoreError::NotFound { .. } => StoreErrorCodes::NOT_FOUND,
            StoreError::Io { .. } => StoreErrorCodes::IO,
            StoreError::Malformed { .. } => StoreErrorCodes::MALFORMED,
            StoreError::NoCalibration => StoreErrorCodes::NO_CALIBRATION,
        }
    }

    fn message(&self) -> String {
        match self {
            StoreError::NotFound { path } => {
                format!("Calibration file '{}' not found; run calibrate first", path)
            }
            StoreError::Io { path, reason } => {
                format!("Error accessing calibration file '{}': {}", path, reason)
            }
            StoreError::Malformed { reason } => {
                format!("Malformed calibration record: {}", reason)
            }
            StoreError::NoCalibration => "No valid calibration data found".to_string(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed {
            reason: err.to_string(),
        }
    }
}
