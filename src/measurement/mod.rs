//! Measurement engine - belt tension measurement by resonant frequency
//!
//! One `measure()` call runs a full frequency sweep: the configured axes are
//! driven sinusoidally at each frequency, the vibration response is sampled
//! and demodulated at the tracked harmonic, and the frequency with the
//! strongest response is reported as the belt's resonant frequency.
//!
//! The engine executes synchronously and blocking on the motion-control
//! context, owns exclusive use of the motion subsystem for its full duration
//! (seconds to minutes) and is not reentrant. It never retries internally;
//! every failure is surfaced once to the caller.

pub mod config;
pub mod demodulation;
pub mod sweep;

pub use config::{
    AmplitudeStrategy, LinearAmplitude, MeasurementConfig, MeasurementResult, ProgressEvent,
    ProgressSink,
};
pub use sweep::FrequencySweep;

use log::{debug, info, warn};

use crate::error::{log_measurement_error, MeasurementError};
use crate::hardware::{Accelerometer, MotionController};
use crate::params::PrinterBeltParameters;

/// Tool index carrying the accelerometer
const MEASUREMENT_TOOL: u8 = 0;

/// Drives the hardware collaborators through one belt tension measurement
pub struct MeasurementEngine {
    motion: Box<dyn MotionController>,
    accelerometer: Box<dyn Accelerometer>,
    params: &'static PrinterBeltParameters,
}

impl MeasurementEngine {
    pub fn new(
        motion: Box<dyn MotionController>,
        accelerometer: Box<dyn Accelerometer>,
        params: &'static PrinterBeltParameters,
    ) -> Self {
        Self {
            motion,
            accelerometer,
            params,
        }
    }

    /// Belt parameter table this engine measures against
    pub fn params(&self) -> &'static PrinterBeltParameters {
        self.params
    }

    /// Measure belt tension by finding the belt system's resonant frequency
    ///
    /// Execute only on the motion-control context. Physically moves the
    /// toolhead and excites the mechanism; blocks until the sweep finishes,
    /// fails, or the progress sink requests an abort.
    ///
    /// Returns `Ok(None)` only for setup-only invocations
    /// (`config.skip_tuning`), which home and position the tool so the
    /// dampeners can be installed before the actual tuning run.
    pub fn measure(
        &mut self,
        config: &MeasurementConfig,
        progress: &mut dyn ProgressSink,
    ) -> Result<Option<MeasurementResult>, MeasurementError> {
        let belt_params = self
            .params
            .belt_systems
            .get(config.belt_system)
            .ok_or_else(|| MeasurementError::SetupFailed {
                reason: format!(
                    "belt system {} out of range (variant has {})",
                    config.belt_system,
                    self.params.belt_system_count()
                ),
            })
            .inspect_err(|err| log_measurement_error(err, "measure"))?;

        info!(
            "[MeasurementEngine] Measuring belt system {} of {:?}: {:?}",
            config.belt_system, self.params.variant, config
        );

        if !config.skip_setup {
            self.run_setup(belt_params.measurement_pos)
                .inspect_err(|err| log_measurement_error(err, "setup"))?;
        }

        if config.skip_tuning {
            info!("[MeasurementEngine] Setup-only invocation, skipping the sweep");
            return Ok(None);
        }

        if config.calibrate_accelerometer {
            self.accelerometer.calibrate().map_err(|err| {
                let err = MeasurementError::AccelerometerCalibrationFailed { reason: err.reason };
                log_measurement_error(&err, "accelerometer_calibration");
                err
            })?;
        }

        let result = self.run_sweep(config, belt_params, progress)?;

        info!(
            "[MeasurementEngine] Belt system {} resonates at {:.1} Hz",
            result.belt_system, result.resonant_frequency_hz
        );
        Ok(Some(result))
    }

    /// Home, select the measurement tool and move to the measurement position
    fn run_setup(
        &mut self,
        position: crate::hardware::Position,
    ) -> Result<(), MeasurementError> {
        let setup_failed = |reason: crate::hardware::HardwareError| MeasurementError::SetupFailed {
            reason: reason.reason,
        };

        self.motion.home().map_err(setup_failed)?;
        self.motion
            .select_tool(MEASUREMENT_TOOL)
            .map_err(setup_failed)?;
        self.motion.move_to(position).map_err(setup_failed)?;
        Ok(())
    }

    /// Excite, settle, sample and demodulate every frequency of the sweep,
    /// then pick the resonance peak
    fn run_sweep(
        &mut self,
        config: &MeasurementConfig,
        belt_params: &crate::params::BeltSystemParameters,
        progress: &mut dyn ProgressSink,
    ) -> Result<MeasurementResult, MeasurementError> {
        let sweep = FrequencySweep::new(
            config.start_frequency_hz,
            config.end_frequency_hz,
            config.frequency_step_hz,
        );
        let point_count = sweep.point_count();
        if point_count == 0 {
            warn!(
                "[MeasurementEngine] Degenerate sweep {}..{} step {}",
                config.start_frequency_hz, config.end_frequency_hz, config.frequency_step_hz
            );
            let err = MeasurementError::NoResonancePeakFound;
            log_measurement_error(&err, "run_sweep");
            return Err(err);
        }

        let mut peak: Option<(f32, f32)> = None;

        for (index, frequency_hz) in sweep.enumerate() {
            let amplitude_m = config.amplitude_for(frequency_hz);

            // Mid-sweep motion/sensor failures mean the tool is no longer
            // reliably positioned, so they surface as SetupFailed.
            self.motion
                .oscillate_axes(
                    belt_params.excitation_axes,
                    frequency_hz,
                    amplitude_m,
                    config.excitation_cycles,
                )
                .map_err(|err| MeasurementError::SetupFailed { reason: err.reason })
                .inspect_err(|err| log_measurement_error(err, "excitation"))?;

            if config.wait_cycles > 0 {
                // Settle window: hold the axes still for wait_cycles periods
                self.motion
                    .oscillate_axes(
                        belt_params.excitation_axes,
                        frequency_hz,
                        0.0,
                        config.wait_cycles,
                    )
                    .map_err(|err| MeasurementError::SetupFailed { reason: err.reason })
                    .inspect_err(|err| log_measurement_error(err, "settle"))?;
            }

            let window_s = config.measurement_cycles as f32 / frequency_hz;
            let window = self
                .accelerometer
                .sample(window_s)
                .map_err(|err| MeasurementError::SetupFailed { reason: err.reason })
                .inspect_err(|err| log_measurement_error(err, "sampling"))?;

            let harmonic_hz = frequency_hz * config.measured_harmonic as f32;
            let magnitude = demodulation::response_magnitude(&window, harmonic_hz);

            debug!(
                "[MeasurementEngine] {:.1} Hz (amplitude {:.1} um): response {:.4}",
                frequency_hz,
                amplitude_m * 1e6,
                magnitude
            );

            if magnitude.is_finite() && magnitude > 0.0 {
                match peak {
                    Some((_, best)) if best >= magnitude => {}
                    _ => peak = Some((frequency_hz, magnitude)),
                }
            }

            let event = ProgressEvent {
                overall_progress: (index + 1) as f32 / point_count as f32,
                frequency_hz,
                amplitude: magnitude,
            };
            // The abort flag is only consulted here, between completed
            // steps, so the current excitation burst always finishes.
            if !progress.on_progress(&event) {
                let err = MeasurementError::Aborted;
                log_measurement_error(&err, "run_sweep");
                return Err(err);
            }
        }

        match peak {
            Some((resonant_frequency_hz, _)) => Ok(MeasurementResult {
                belt_system: config.belt_system,
                resonant_frequency_hz,
            }),
            None => {
                let err = MeasurementError::NoResonancePeakFound;
                log_measurement_error(&err, "run_sweep");
                Err(err)
            }
        }
    }
}
