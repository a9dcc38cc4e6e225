// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Single source of truth for the numeric codes reported by the CLI and logs.
///
/// Error code range: 2001-2004
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Fewer calibration points than the fit requires
    pub const INSUFFICIENT_POINTS: i32 = 2001;

    /// No calibration point produced a single valid sample
    pub const NO_SAMPLES: i32 = 2002;

    /// Operator entered a weight that cannot be used
    pub const INVALID_WEIGHT: i32 = 2003;

    /// Every raw mean is identical, so the slope is undefined
    pub const DEGENERATE_READINGS: i32 = 2004;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationFitter, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These cover the precondition failures of a calibration run. They are
/// reported separately from transport faults so the operator can tell
/// "sensor absent" from "port broken".
///
/// Error code range: 2001-2004
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Not enough calibration points to fit a line
    InsufficientPoints { required: usize, collected: usize },

    /// Points were entered but none of them collected any readings
    NoSamples { points: usize },

    /// Weight is negative or not a finite number
    InvalidWeight { weight_kg: f64 },

    /// All raw means are equal; a line through them has no defined slope
    DegenerateReadings { raw_value: f64 },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InsufficientPoints { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_POINTS
            }
            CalibrationError::NoSamples { .. } => CalibrationErrorCodes::NO_SAMPLES,
            CalibrationError::InvalidWeight { .. } => CalibrationErrorCodes::INVALID_WEIGHT,
            CalibrationError::DegenerateReadings { .. } => {
                CalibrationErrorCodes::DEGENERATE_READINGS
            }
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InsufficientPoints {
                required,
                collected,
            } => {
                format!(
                    "Need at least {} calibration points, got {}",
                    required, collected
                )
            }
            CalibrationError::NoSamples { points } => {
                format!("No sensor samples collected for any of {} points", points)
            }
            CalibrationError::InvalidWeight { weight_kg } => {
                format!("Invalid weight {} kg: must be finite and >= 0", weight_kg)
            }
            CalibrationError::DegenerateReadings { raw_value } => {
                format!(
                    "All calibration points read {:.3}; slope is undefined",
                    raw_value
                )
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(
            CalibrationError::InsufficientPoints {
                required: 2,
                collected: 1
            }
            .code(),
            CalibrationErrorCodes::INSUFFICIENT_POINTS
        );
        assert_eq!(
            CalibrationError::NoSamples { points: 3 }.code(),
            CalibrationErrorCodes::NO_SAMPLES
        );
        assert_eq!(
            CalibrationError::InvalidWeight { weight_kg: -1.0 }.code(),
            CalibrationErrorCodes::INVALID_WEIGHT
        );
        assert_eq!(
            CalibrationError::DegenerateReadings { raw_value: 4.0 }.code(),
            CalibrationErrorCodes::DEGENERATE_READINGS
        );
    }

    #[test]
    fn test_calibration_error_messages() {
        let err = CalibrationError::InsufficientPoints {
            required: 2,
            collected: 0,
        };
        assert_eq!(err.message(), "Need at least 2 calibration points, got 0");

        let err = CalibrationError::NoSamples { points: 4 };
        assert!(err.message().contains("any of 4 points"));

        let err = CalibrationError::InvalidWeight { weight_kg: -0.5 };
        assert!(err.message().contains("-0.5 kg"));

        let err = CalibrationError::DegenerateReadings { raw_value: 12.5 };
        assert!(err.message().contains("12.500"));
    }

    #[test]
    fn test_calibration_error_display() {
        let err = CalibrationError::NoSamples { points: 2 };
        let display = format!("{}", err);
        assert!(display.contains("CalibrationError"));
        assert!(display.contains(&err.code().to_string()));
    }
}
