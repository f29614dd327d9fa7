// Measurement error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Measurement error code constants exposed to the presentation layer
///
/// These constants provide a single source of truth for error codes shared
/// between the engine and whatever UI consumes the wizard's phase snapshots.
///
/// Error code range: 1001-1004
pub struct MeasurementErrorCodes {}

impl MeasurementErrorCodes {
    /// Homing, tool selection or move to the measurement position failed
    pub const SETUP_FAILED: i32 = 1001;

    /// Accelerometer self-calibration failed
    pub const ACCELEROMETER_CALIBRATION_FAILED: i32 = 1002;

    /// The progress callback requested an abort
    pub const ABORTED: i32 = 1003;

    /// The sweep completed but produced no usable response magnitude
    pub const NO_RESONANCE_PEAK_FOUND: i32 = 1004;
}

/// Log a measurement error with structured context
///
/// Logs the error with its numeric code so failures surfaced to the wizard
/// can be correlated with the engine log. Non-blocking, never panics.
pub fn log_measurement_error(err: &MeasurementError, context: &str) {
    error!(
        "Measurement error in {}: code={}, component=MeasurementEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced by the measurement engine
///
/// Every failure is surfaced exactly once to the caller; the engine never
/// retries internally. The wizard is the sole retry authority.
///
/// Error code range: 1001-1004
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementError {
    /// Homing, tool selection or move to the measurement position failed
    SetupFailed { reason: String },

    /// Accelerometer self-calibration failed
    AccelerometerCalibrationFailed { reason: String },

    /// The progress callback requested an abort between sweep steps
    Aborted,

    /// The sweep completed but no usable response magnitude was found
    NoResonancePeakFound,
}

impl ErrorCode for MeasurementError {
    fn code(&self) -> i32 {
        match self {
            MeasurementError::SetupFailed { .. } => MeasurementErrorCodes::SETUP_FAILED,
            MeasurementError::AccelerometerCalibrationFailed { .. } => {
                MeasurementErrorCodes::ACCELEROMETER_CALIBRATION_FAILED
            }
            MeasurementError::Aborted => MeasurementErrorCodes::ABORTED,
            MeasurementError::NoResonancePeakFound => {
                MeasurementErrorCodes::NO_RESONANCE_PEAK_FOUND
            }
        }
    }

    fn message(&self) -> String {
        match self {
            MeasurementError::SetupFailed { reason } => {
                format!("Measurement setup failed: {}", reason)
            }
            MeasurementError::AccelerometerCalibrationFailed { reason } => {
                format!("Accelerometer calibration failed: {}", reason)
            }
            MeasurementError::Aborted => "Measurement aborted".to_string(),
            MeasurementError::NoResonancePeakFound => {
                "No resonance peak found in the swept frequency range".to_string()
            }
        }
    }
}

impl fmt::Display for MeasurementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeasurementError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for MeasurementError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_error_codes() {
        assert_eq!(
            MeasurementError::SetupFailed {
                reason: "test".to_string()
            }
            .code(),
            MeasurementErrorCodes::SETUP_FAILED
        );
        assert_eq!(
            MeasurementError::AccelerometerCalibrationFailed {
                reason: "test".to_string()
            }
            .code(),
            MeasurementErrorCodes::ACCELEROMETER_CALIBRATION_FAILED
        );
        assert_eq!(MeasurementError::Aborted.code(), MeasurementErrorCodes::ABORTED);
        assert_eq!(
            MeasurementError::NoResonancePeakFound.code(),
            MeasurementErrorCodes::NO_RESONANCE_PEAK_FOUND
        );
    }

    #[test]
    fn test_measurement_error_messages() {
        let err = MeasurementError::SetupFailed {
            reason: "homing failed".to_string(),
        };
        assert_eq!(err.message(), "Measurement setup failed: homing failed");

        let err = MeasurementError::AccelerometerCalibrationFailed {
            reason: "no response".to_string(),
        };
        assert!(err.message().contains("no response"));

        let err = MeasurementError::Aborted;
        assert!(err.message().contains("aborted"));

        let err = MeasurementError::NoResonancePeakFound;
        assert!(err.message().contains("No resonance peak"));
    }

    #[test]
    fn test_measurement_error_display() {
        let err = MeasurementError::Aborted;
        let display = format!("{}", err);
        assert!(display.contains("MeasurementError"));
        assert!(display.contains(&err.code().to_string()));
    }
}
