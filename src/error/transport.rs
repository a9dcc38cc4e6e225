// Transport error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Transport error code constants
///
/// Error code range: 1001-1003
pub struct TransportErrorCodes {}

impl TransportErrorCodes {
    /// The serial port (or replay file) could not be opened
    pub const OPEN_FAILED: i32 = 1001;

    /// A read failed for a reason other than a timeout
    pub const READ_FAILED: i32 = 1002;

    /// Listing the available serial ports failed
    pub const PORT_ENUMERATION_FAILED: i32 = 1003;
}

/// Log a transport error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_transport_error(err: &TransportError, context: &str) {
    error!(
        "Transport error in {}: code={}, component=LineSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Transport-related errors
///
/// A transport fault is fatal to the current session. Timeouts and
/// undecodable lines are not faults; they surface as empty reads instead.
///
/// Error code range: 1001-1003
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Failed to open the line source
    OpenFailed { port: String, reason: String },

    /// Failed to read from an open line source
    ReadFailed { reason: String },

    /// Failed to enumerate serial ports
    PortEnumerationFailed { reason: String },
}

impl ErrorCode for TransportError {
    fn code(&self) -> i32 {
        match self {
            TransportError::OpenFailed { .. } => TransportErrorCodes::OPEN_FAILED,
            TransportError::ReadFailed { .. } => TransportErrorCodes::READ_FAILED,
            TransportError::PortEnumerationFailed { .. } => {
                TransportErrorCodes::PORT_ENUMERATION_FAILED
            }
        }
    }

    fn message(&self) -> String {
        match self {
            TransportError::OpenFailed { port, reason } => {
                format!("Could not open {}: {}", port, reason)
            }
            TransportError::ReadFailed { reason } => format!("Read failed: {}", reason),
            TransportError::PortEnumerationFailed { reason } => {
                format!("Could not list serial ports: {}", reason)
            }
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransportError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TransportError {}

/// Convert from std::io::Error to TransportError
impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::ReadFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_codes() {
        assert_eq!(
            TransportError::OpenFailed {
                port: "/dev/ttyACM0".to_string(),
                reason: "busy".to_string()
            }
            .code(),
            1001
        );
        assert_eq!(
            TransportError::ReadFailed {
                reason: "test".to_string()
            }
            .code(),
            1002
        );
        assert_eq!(
            TransportError::PortEnumerationFailed {
                reason: "test".to_string()
            }
            .code(),
            1003
        );
    }

    #[test]
    fn test_open_failed_message_names_port() {
        let err = TransportError::OpenFailed {
            port: "COM4".to_string(),
            reason: "Access is denied".to_string(),
        };
        assert_eq!(err.message(), "Could not open COM4: Access is denied");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "cable pulled");
        let err: TransportError = io_err.into();

        match err {
            TransportError::ReadFailed { reason } => assert!(reason.contains("cable pulled")),
            other => panic!("Expected ReadFailed variant, got {:?}", other),
        }
    }
}
