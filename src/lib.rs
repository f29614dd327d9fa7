// Belt Tuner - belt tension measurement and calibration engine
// Frequency-sweep excitation, synchronous demodulation, tension physics
// and a multi-phase calibration wizard.

// Module declarations
pub mod config;
pub mod error;
pub mod hardware;
pub mod measurement;
pub mod params;
pub mod tension;
pub mod wizard;

// Re-exports for convenience
pub use config::AppConfig;
pub use error::{ErrorCode, MeasurementError, WizardError};
pub use measurement::{MeasurementConfig, MeasurementEngine, MeasurementResult};
pub use params::{PrinterBeltParameters, PrinterVariant};
pub use tension::TensionCalculator;
pub use wizard::{BeltTuningWizard, Phase, UserResponse, WizardOptions};
