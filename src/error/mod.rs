// Error types for the force sensor host
//
// Transport, calibration and store failures each get their own enum with a
// stable numeric code. Parse misses are not errors and never appear here.

mod calibration;
mod store;
mod transport;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use store::{log_store_error, StoreError, StoreErrorCodes};
pub use transport::{log_transport_error, TransportError, TransportErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so the CLI and logs report failures the same way.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
