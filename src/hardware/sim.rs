//! Simulated measurement rig for desktop testing
//!
//! This module provides an in-memory implementation of the motion and
//! accelerometer collaborators so the engine and wizard can run on a
//! development machine without printer hardware. The rig models the belt as
//! a damped resonator: excitation near its natural frequency produces a
//! strong response at the measured harmonic, excitation elsewhere a weak
//! one. Tests and the CLI both drive real measurements through it.

use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    Accelerometer, ExcitationAxes, HardwareError, MotionController, Position, SampleWindow,
};

/// Default accelerometer output data rate (Hz)
const DEFAULT_SAMPLE_RATE_HZ: f32 = 1344.0;

/// Scale from excitation amplitude (meters) to response acceleration (m/s^2)
const RESPONSE_COUPLING: f32 = 1000.0;

/// Simulated belt-tuning rig
///
/// Tracks setup state (homed, tool, position) so tests can assert the engine
/// performed physical setup, records every nonzero excitation so tests can
/// assert which frequencies were actually driven, and synthesizes
/// accelerometer windows from the most recent excitation.
pub struct SimulatedRig {
    natural_frequency_hz: f32,
    damping_ratio: f32,
    response_harmonic: u16,
    sample_rate_hz: f32,
    noise_m_s2: f32,
    rng: StdRng,

    homed: bool,
    tool: Option<u8>,
    position: Option<Position>,
    calibrated: bool,
    last_excitation: Option<(f32, f32)>,
    excitations: Vec<(f32, f32)>,

    /// Force the next home() call to fail
    pub fail_homing: bool,
    /// Force the next move_to() call to fail
    pub fail_move: bool,
    /// Force the next calibrate() call to fail
    pub fail_calibration: bool,
}

impl SimulatedRig {
    /// Create a rig whose belt resonates at the given frequency
    pub fn new(natural_frequency_hz: f32) -> Self {
        Self {
            natural_frequency_hz,
            damping_ratio: 0.01,
            response_harmonic: 2,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            noise_m_s2: 0.002,
            rng: StdRng::seed_from_u64(0x42),
            homed: false,
            tool: None,
            position: None,
            calibrated: false,
            last_excitation: None,
            excitations: Vec::new(),
            fail_homing: false,
            fail_move: false,
            fail_calibration: false,
        }
    }

    /// Override the noise floor (m/s^2)
    pub fn with_noise(mut self, noise_m_s2: f32) -> Self {
        self.noise_m_s2 = noise_m_s2;
        self
    }

    /// Override the RNG seed for deterministic noise
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Override the harmonic the belt responds at
    pub fn with_response_harmonic(mut self, harmonic: u16) -> Self {
        self.response_harmonic = harmonic;
        self
    }

    /// Move the simulated resonance
    pub fn set_natural_frequency(&mut self, frequency_hz: f32) {
        self.natural_frequency_hz = frequency_hz;
    }

    /// Frequencies that were actually excited with nonzero amplitude
    pub fn excited_frequencies(&self) -> Vec<f32> {
        self.excitations.iter().map(|(f, _)| *f).collect()
    }

    pub fn is_homed(&self) -> bool {
        self.homed
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Steady-state response gain of a damped resonator
    ///
    /// Peaks at 1 / (2 * damping_ratio) when the excitation frequency equals
    /// the natural frequency and falls off on both sides.
    fn response_gain(&self, frequency_hz: f32) -> f32 {
        let r = frequency_hz / self.natural_frequency_hz;
        let elastic = 1.0 - r * r;
        let damped = 2.0 * self.damping_ratio * r;
        1.0 / (elastic * elastic + damped * damped).sqrt()
    }
}

impl MotionController for SimulatedRig {
    fn home(&mut self) -> Result<(), HardwareError> {
        if self.fail_homing {
            return Err(HardwareError::new("simulated homing failure"));
        }
        self.homed = true;
        Ok(())
    }

    fn select_tool(&mut self, tool: u8) -> Result<(), HardwareError> {
        if !self.homed {
            return Err(HardwareError::new("tool change before homing"));
        }
        self.tool = Some(tool);
        Ok(())
    }

    fn move_to(&mut self, position: Position) -> Result<(), HardwareError> {
        if self.fail_move {
            return Err(HardwareError::new("simulated move failure"));
        }
        if !self.homed {
            return Err(HardwareError::new("move before homing"));
        }
        self.position = Some(position);
        Ok(())
    }

    fn oscillate_axes(
        &mut self,
        _axes: ExcitationAxes,
        frequency_hz: f32,
        amplitude_m: f32,
        _cycles: u32,
    ) -> Result<(), HardwareError> {
        if frequency_hz <= 0.0 {
            return Err(HardwareError::new("non-positive excitation frequency"));
        }
        if amplitude_m > 0.0 {
            self.last_excitation = Some((frequency_hz, amplitude_m));
            self.excitations.push((frequency_hz, amplitude_m));
        }
        Ok(())
    }
}

impl Accelerometer for SimulatedRig {
    fn calibrate(&mut self) -> Result<(), HardwareError> {
        if self.fail_calibration {
            return Err(HardwareError::new("simulated calibration failure"));
        }
        self.calibrated = true;
        Ok(())
    }

    fn sample(&mut self, duration_s: f32) -> Result<SampleWindow, HardwareError> {
        if duration_s <= 0.0 {
            return Err(HardwareError::new("non-positive sample duration"));
        }

        let count = (duration_s * self.sample_rate_hz).round() as usize;
        let mut samples = Vec::with_capacity(count);

        let response = self.last_excitation.map(|(frequency_hz, amplitude_m)| {
            let gain = self.response_gain(frequency_hz);
            let response_hz = frequency_hz * self.response_harmonic as f32;
            (gain * amplitude_m * RESPONSE_COUPLING, response_hz)
        });

        for k in 0..count {
            let t = k as f32 / self.sample_rate_hz;
            let mut value = self.noise_m_s2 * self.rng.gen_range(-1.0..1.0);
            if let Some((amplitude, response_hz)) = response {
                value += amplitude * (std::f32::consts::TAU * response_hz * t).sin();
            }
            samples.push(value);
        }

        Ok(SampleWindow {
            sample_rate_hz: self.sample_rate_hz,
            samples,
        })
    }
}

/// Cloneable handle sharing one rig between the motion and accelerometer
/// seams of the engine, while tests keep their own handle for inspection
#[derive(Clone)]
pub struct RigHandle(Arc<Mutex<SimulatedRig>>);

impl RigHandle {
    pub fn new(rig: SimulatedRig) -> Self {
        Self(Arc::new(Mutex::new(rig)))
    }

    /// Lock the underlying rig for inspection or fault injection
    pub fn lock(&self) -> MutexGuard<'_, SimulatedRig> {
        self.0.lock().unwrap()
    }
}

impl MotionController for RigHandle {
    fn home(&mut self) -> Result<(), HardwareError> {
        self.0.lock().unwrap().home()
    }

    fn select_tool(&mut self, tool: u8) -> Result<(), HardwareError> {
        self.0.lock().unwrap().select_tool(tool)
    }

    fn move_to(&mut self, position: Position) -> Result<(), HardwareError> {
        self.0.lock().unwrap().move_to(position)
    }

    fn oscillate_axes(
        &mut self,
        axes: ExcitationAxes,
        frequency_hz: f32,
        amplitude_m: f32,
        cycles: u32,
    ) -> Result<(), HardwareError> {
        self.0
            .lock()
            .unwrap()
            .oscillate_axes(axes, frequency_hz, amplitude_m, cycles)
    }
}

impl Accelerometer for RigHandle {
    fn calibrate(&mut self) -> Result<(), HardwareError> {
        self.0.lock().unwrap().calibrate()
    }

    fn sample(&mut self, duration_s: f32) -> Result<SampleWindow, HardwareError> {
        self.0.lock().unwrap().sample(duration_s)
    }
}
