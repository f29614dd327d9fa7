// Error types for the belt tuner
//
// This module defines custom error types for measurement and wizard
// operations, providing structured error handling with numeric error codes
// suitable for forwarding to the presentation layer.

mod measurement;
mod wizard;

pub use measurement::{log_measurement_error, MeasurementError, MeasurementErrorCodes};
pub use wizard::{WizardError, WizardErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the presentation boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
