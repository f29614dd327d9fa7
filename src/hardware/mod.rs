//! Hardware collaborator interfaces consumed by the measurement engine
//!
//! The engine drives the machine exclusively through these two traits, so
//! the tension algorithm is testable against a simulated rig and portable
//! across motion stacks. Implementations execute on the motion-control
//! context; every call here physically moves hardware and may block for
//! seconds.

pub mod sim;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Toolhead position in machine coordinates (millimeters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x_mm: f32,
    pub y_mm: f32,
    pub z_mm: f32,
}

impl Position {
    pub fn new(x_mm: f32, y_mm: f32, z_mm: f32) -> Self {
        Self { x_mm, y_mm, z_mm }
    }
}

/// Axis set used for exciting a belt system
///
/// Driving both X and Y with the Y direction inverted vibrates a CoreXY
/// toolhead front and back; a single axis excites one bedslinger belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcitationAxes {
    pub x: bool,
    pub y: bool,
    /// Invert the Y step direction relative to X
    pub y_inverted: bool,
}

impl ExcitationAxes {
    /// X and Y together, Y inverted (front/back toolhead motion on CoreXY)
    pub const fn core_xy_front_back() -> Self {
        Self {
            x: true,
            y: true,
            y_inverted: true,
        }
    }

    /// X axis only
    pub const fn x_only() -> Self {
        Self {
            x: true,
            y: false,
            y_inverted: false,
        }
    }

    /// Y axis only
    pub const fn y_only() -> Self {
        Self {
            x: false,
            y: true,
            y_inverted: false,
        }
    }
}

/// Failure reported by a hardware collaborator
///
/// Collaborators report a flat reason string; the engine maps it onto its
/// own error kinds depending on which operation failed.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareError {
    pub reason: String,
}

impl HardwareError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hardware error: {}", self.reason)
    }
}

impl std::error::Error for HardwareError {}

/// Motion subsystem interface
///
/// The engine owns exclusive use of the motion subsystem for the full
/// duration of a measurement; implementations are not expected to be
/// reentrant.
pub trait MotionController {
    /// Home all axes
    fn home(&mut self) -> Result<(), HardwareError>;

    /// Select the tool carrying the accelerometer
    fn select_tool(&mut self, tool: u8) -> Result<(), HardwareError>;

    /// Move the toolhead to the given position
    fn move_to(&mut self, position: Position) -> Result<(), HardwareError>;

    /// Drive the given axes sinusoidally for a whole number of periods
    ///
    /// Blocks until `cycles / frequency_hz` seconds of motion have been
    /// executed. A zero amplitude produces no motion and is used as a
    /// settle window between excitation and sampling.
    fn oscillate_axes(
        &mut self,
        axes: ExcitationAxes,
        frequency_hz: f32,
        amplitude_m: f32,
        cycles: u32,
    ) -> Result<(), HardwareError>;
}

/// One contiguous window of accelerometer samples
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    /// Sampling rate of the time series (Hz)
    pub sample_rate_hz: f32,
    /// Acceleration along the measurement axis (m/s^2)
    pub samples: Vec<f32>,
}

/// Accelerometer interface
pub trait Accelerometer {
    /// Run the accelerometer self-calibration routine
    fn calibrate(&mut self) -> Result<(), HardwareError>;

    /// Sample acceleration for the given duration
    fn sample(&mut self, duration_s: f32) -> Result<SampleWindow, HardwareError>;
}
