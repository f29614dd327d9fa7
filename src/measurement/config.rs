// Measurement configuration, progress protocol and result types
//
// A MeasurementConfig is a one-shot value describing a single frequency
// sweep. It is created per invocation, usually from a belt system's default
// sweep parameters, and discarded after measure() returns.

use std::fmt;
use std::sync::Arc;

use crate::params::{AmplitudeAnchors, BeltSystemParameters};

/// Strategy for choosing the excitation amplitude at a given frequency
///
/// Allows alternative amplitude schedules without touching the engine.
pub trait AmplitudeStrategy: Send + Sync {
    /// Excitation amplitude (meters) to use at the given frequency
    fn amplitude_m(&self, frequency_hz: f32) -> f32;
}

/// Linear interpolation between two calibrated (frequency, amplitude) anchors
///
/// Frequencies outside the anchor span extrapolate along the same line,
/// matching how the anchors were calibrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAmplitude {
    pub frequency_a_hz: f32,
    pub amplitude_a_m: f32,
    pub frequency_b_hz: f32,
    pub amplitude_b_m: f32,
}

impl From<AmplitudeAnchors> for LinearAmplitude {
    fn from(anchors: AmplitudeAnchors) -> Self {
        Self {
            frequency_a_hz: anchors.frequency_a_hz,
            amplitude_a_m: anchors.amplitude_a_m,
            frequency_b_hz: anchors.frequency_b_hz,
            amplitude_b_m: anchors.amplitude_b_m,
        }
    }
}

impl AmplitudeStrategy for LinearAmplitude {
    fn amplitude_m(&self, frequency_hz: f32) -> f32 {
        self.amplitude_a_m
            + (frequency_hz - self.frequency_a_hz) * (self.amplitude_b_m - self.amplitude_a_m)
                / (self.frequency_b_hz - self.frequency_a_hz)
    }
}

/// Progress report delivered once per evaluated frequency
///
/// Transient value; the engine never retains it past delivery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Overall sweep completion, 0-1
    pub overall_progress: f32,
    /// The frequency just tested (Hz)
    pub frequency_hz: f32,
    /// Measured response amplitude at that frequency
    pub amplitude: f32,
}

/// Receiver for per-frequency progress reports
///
/// Called synchronously on the motion-control context immediately after each
/// frequency step, so implementations must be non-blocking and
/// allocation-free, and must not drive motion themselves. Returning `false`
/// aborts the sweep after the current step; the flag is never consulted
/// mid-excitation, so the running burst always finishes cleanly.
pub trait ProgressSink {
    fn on_progress(&mut self, event: &ProgressEvent) -> bool;
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent) -> bool,
{
    fn on_progress(&mut self, event: &ProgressEvent) -> bool {
        self(event)
    }
}

/// One-shot description of a frequency sweep
#[derive(Clone)]
pub struct MeasurementConfig {
    /// Index of the belt system being measured
    pub belt_system: usize,

    /// (Hz) Start frequency of the tuning scan
    pub start_frequency_hz: f32,
    /// (Hz) End frequency of the tuning scan, inclusive
    pub end_frequency_hz: f32,
    /// (Hz) Increment of the frequency sweep
    pub frequency_step_hz: f32,

    /// (1/frequency) Excitation sine periods per step
    pub excitation_cycles: u32,
    /// (1/frequency) Settle periods between excitation and sampling
    pub wait_cycles: u32,
    /// (1/frequency) Sampling periods per step
    pub measurement_cycles: u32,
    /// Which harmonic of the excitation frequency is measured
    pub measured_harmonic: u16,

    /// (meters) Fixed excitation amplitude
    pub excitation_amplitude_m: f32,
    /// Frequency-dependent amplitude; overrides the fixed amplitude when set
    pub amplitude_strategy: Option<Arc<dyn AmplitudeStrategy>>,

    /// Run accelerometer self-calibration before the sweep
    pub calibrate_accelerometer: bool,

    /// Skip the initial setup (homing, tool selection, positioning); it is
    /// assumed to have been done beforehand, see `skip_tuning`
    pub skip_setup: bool,

    /// Only do the initial setup and skip the sweep entirely. Useful for
    /// positioning the tool so the dampeners can be put on; the actual
    /// tuning is then invoked with `skip_setup`
    pub skip_tuning: bool,
}

impl MeasurementConfig {
    /// Build a config from a belt system's default sweep parameters
    pub fn from_belt_system(belt_system: usize, params: &BeltSystemParameters) -> Self {
        let sweep = &params.sweep;
        Self {
            belt_system,
            start_frequency_hz: sweep.start_frequency_hz,
            end_frequency_hz: sweep.end_frequency_hz,
            frequency_step_hz: sweep.frequency_step_hz,
            excitation_cycles: sweep.excitation_cycles,
            wait_cycles: sweep.wait_cycles,
            measurement_cycles: sweep.measurement_cycles,
            measured_harmonic: sweep.measured_harmonic,
            excitation_amplitude_m: sweep.excitation_amplitude_m,
            amplitude_strategy: sweep
                .amplitude_anchors
                .map(|anchors| Arc::new(LinearAmplitude::from(anchors)) as Arc<dyn AmplitudeStrategy>),
            calibrate_accelerometer: true,
            skip_setup: false,
            skip_tuning: false,
        }
    }

    /// Excitation amplitude to use at the given frequency
    pub fn amplitude_for(&self, frequency_hz: f32) -> f32 {
        match &self.amplitude_strategy {
            Some(strategy) => strategy.amplitude_m(frequency_hz),
            None => self.excitation_amplitude_m,
        }
    }
}

impl fmt::Debug for MeasurementConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementConfig")
            .field("belt_system", &self.belt_system)
            .field("start_frequency_hz", &self.start_frequency_hz)
            .field("end_frequency_hz", &self.end_frequency_hz)
            .field("frequency_step_hz", &self.frequency_step_hz)
            .field("excitation_cycles", &self.excitation_cycles)
            .field("wait_cycles", &self.wait_cycles)
            .field("measurement_cycles", &self.measurement_cycles)
            .field("measured_harmonic", &self.measured_harmonic)
            .field("excitation_amplitude_m", &self.excitation_amplitude_m)
            .field("has_amplitude_strategy", &self.amplitude_strategy.is_some())
            .field("calibrate_accelerometer", &self.calibrate_accelerometer)
            .field("skip_setup", &self.skip_setup)
            .field("skip_tuning", &self.skip_tuning)
            .finish()
    }
}

/// Outcome of a completed sweep
///
/// Derived quantities (tension force, screw turns) are computed on demand by
/// the tension calculator from this value plus the matching belt system
/// parameters; they are deliberately not stored here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementResult {
    /// Index of the measured belt system
    pub belt_system: usize,
    /// The most resonant frequency of the belt (Hz)
    pub resonant_frequency_hz: f32,
}
