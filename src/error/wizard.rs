// Wizard error types and constants

use crate::error::ErrorCode;
use crate::wizard::{Phase, UserResponse};
use std::fmt;

/// Wizard error code constants
///
/// Error code range: 2001-2002
pub struct WizardErrorCodes {}

impl WizardErrorCodes {
    /// A user response arrived that the current phase does not accept
    pub const UNEXPECTED_RESPONSE: i32 = 2001;

    /// A response arrived after the wizard already finished
    pub const ALREADY_FINISHED: i32 = 2002;
}

/// Errors surfaced by the calibration wizard
///
/// Measurement failures are not represented here: the wizard handles them by
/// transitioning to the `Error` phase and offering retry. These errors cover
/// protocol violations by the input layer only.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardError {
    /// A user response arrived that the current phase does not accept
    UnexpectedResponse { phase: Phase, response: UserResponse },

    /// A response arrived after the wizard already finished
    AlreadyFinished,
}

impl ErrorCode for WizardError {
    fn code(&self) -> i32 {
        match self {
            WizardError::UnexpectedResponse { .. } => WizardErrorCodes::UNEXPECTED_RESPONSE,
            WizardError::AlreadyFinished => WizardErrorCodes::ALREADY_FINISHED,
        }
    }

    fn message(&self) -> String {
        match self {
            WizardError::UnexpectedResponse { phase, response } => {
                format!("Unexpected response {:?} in phase {:?}", response, phase)
            }
            WizardError::AlreadyFinished => "Wizard already finished".to_string(),
        }
    }
}

impl fmt::Display for WizardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WizardError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for WizardError {}
