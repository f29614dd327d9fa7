//! Belt tuning wizard - multi-phase calibration workflow
//!
//! Drives the measurement engine through every belt system of the printer
//! variant, blocking on user confirmations between hardware steps. Phase
//! changes and live sweep progress are published as snapshots on a broadcast
//! channel so any number of presentation layers can mirror the workflow
//! without holding a reference to the wizard.
//!
//! The wizard runs on the motion-control context like the engine it wraps;
//! `handle_response` blocks while hardware work triggered by the response is
//! in flight.

pub mod graph;
pub mod phase;

pub use graph::{GraphBuffer, GRAPH_HEIGHT, GRAPH_WIDTH};
pub use phase::{Phase, UserResponse};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{ErrorCode, MeasurementError, WizardError};
use crate::measurement::{MeasurementConfig, MeasurementEngine, MeasurementResult, ProgressEvent};
use crate::tension::TensionCalculator;
use phase::{transition, Action, TransitionContext, WizardEvent};

/// Broadcast channel capacity for phase snapshots
const SNAPSHOT_CHANNEL_CAPACITY: usize = 128;

/// Workflow options, usually sourced from the config file
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WizardOptions {
    /// Insert the hands-on vibration check phase after each sweep
    #[serde(default)]
    pub vibration_check: bool,
    /// Run accelerometer self-calibration before each sweep
    #[serde(default = "default_true")]
    pub calibrate_accelerometer: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            vibration_check: false,
            calibrate_accelerometer: true,
        }
    }
}

/// Published on every phase change and on every sweep progress report
#[derive(Debug, Clone)]
pub struct PhaseSnapshot {
    pub phase: Phase,
    /// Index of the belt system the wizard is currently working on
    pub belt_system: usize,
    pub data: PhaseData,
}

/// Phase-specific presentation payload
#[derive(Debug, Clone)]
pub enum PhaseData {
    /// Blocking phases carry no payload
    Empty,
    Calibrating,
    Measuring {
        /// Sweep completion, 0-1
        progress: f32,
        /// Frequency just tested (Hz)
        last_frequency_hz: f32,
        /// Response magnitude at that frequency, normalized to the running peak
        last_amplitude: f32,
        graph: [u8; GRAPH_WIDTH],
    },
    Results {
        resonant_frequency_hz: f32,
        tension_force_n: f32,
        /// Tensioner screw turns; positive tightens, 0 means within tolerance
        adjust_screw_turns: f32,
        target_tension_force_n: f32,
        target_tension_tolerance_n: f32,
        graph: [u8; GRAPH_WIDTH],
    },
    Error {
        code: i32,
        message: String,
    },
}

/// The belt tuning workflow for one printer variant
pub struct BeltTuningWizard {
    engine: MeasurementEngine,
    options: WizardOptions,
    phase: Phase,
    belt_system: usize,
    dampeners_installed: bool,
    aborted: bool,
    last_result: Option<MeasurementResult>,
    last_error: Option<MeasurementError>,
    graph: GraphBuffer,
    cancel_requested: Arc<AtomicBool>,
    snapshot_tx: broadcast::Sender<PhaseSnapshot>,
}

impl BeltTuningWizard {
    pub fn new(engine: MeasurementEngine, options: WizardOptions) -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            engine,
            options,
            phase: Phase::AskForGantryAlign,
            belt_system: 0,
            dampeners_installed: false,
            aborted: false,
            last_result: None,
            last_error: None,
            graph: GraphBuffer::new(),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            snapshot_tx,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Belt system currently being worked on
    pub fn belt_system(&self) -> usize {
        self.belt_system
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// True once finished, if the workflow ended by abort rather than
    /// completing every belt system
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }

    /// Subscribe to phase snapshots
    ///
    /// Slow receivers lag rather than block the workflow.
    pub fn subscribe(&self) -> broadcast::Receiver<PhaseSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Shared cancellation flag for the presentation layer
    ///
    /// Setting it aborts the running sweep at the next step boundary; the
    /// wizard then finishes as aborted.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_requested)
    }

    /// Request cancellation of the running sweep
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Relaxed);
    }

    /// Current phase snapshot, for late subscribers
    pub fn snapshot(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            phase: self.phase,
            belt_system: self.belt_system,
            data: self.phase_data(),
        }
    }

    /// Feed one user response into the workflow
    ///
    /// Blocks while hardware work triggered by the response runs. Responses
    /// the current phase does not accept are rejected without changing state.
    pub fn handle_response(&mut self, response: UserResponse) -> Result<(), WizardError> {
        if self.phase == Phase::Done {
            return Err(WizardError::AlreadyFinished);
        }
        info!(
            "[BeltTuningWizard] Response {:?} in phase {:?}",
            response, self.phase
        );
        self.dispatch(WizardEvent::Response(response))
    }

    /// Run events through the transition table until the workflow blocks on
    /// the user again
    fn dispatch(&mut self, event: WizardEvent) -> Result<(), WizardError> {
        let mut pending = Some(event);

        while let Some(event) = pending.take() {
            let ctx = TransitionContext {
                dampeners_installed: self.dampeners_installed,
                more_belt_systems: self.belt_system + 1 < self.engine.params().belt_system_count(),
                vibration_check_enabled: self.options.vibration_check,
            };

            let Some(step) = transition(self.phase, event, &ctx) else {
                return match event {
                    WizardEvent::Response(response) => Err(WizardError::UnexpectedResponse {
                        phase: self.phase,
                        response,
                    }),
                    _ => {
                        // Engine outcomes always have a transition; reaching
                        // this arm means the table is out of sync.
                        error!(
                            "[BeltTuningWizard] No transition for {:?} in phase {:?}",
                            event, self.phase
                        );
                        Ok(())
                    }
                };
            };

            self.apply_bookkeeping(event, step.next);
            info!(
                "[BeltTuningWizard] Phase {:?} -> {:?}",
                self.phase, step.next
            );
            self.phase = step.next;
            self.publish();

            pending = match step.action {
                Action::None => None,
                Action::RunPreparation => Some(self.run_preparation()),
                Action::RunMeasurement => Some(self.run_measurement()),
            };
        }
        Ok(())
    }

    /// State updates tied to specific transitions, applied before the phase
    /// change is published
    fn apply_bookkeeping(&mut self, event: WizardEvent, next: Phase) {
        if next == Phase::Done
            && matches!(
                event,
                WizardEvent::Response(UserResponse::Abort) | WizardEvent::MeasurementAborted
            )
        {
            self.aborted = true;
        }

        match (self.phase, next) {
            // Advancing to the next belt system
            (Phase::Results, Phase::Preparing) => {
                self.belt_system += 1;
                self.last_result = None;
                self.graph.clear();
            }
            // Retry restarts the current belt system from scratch
            (Phase::Error, Phase::Preparing) => {
                self.last_error = None;
                self.last_result = None;
                self.graph.clear();
            }
            (Phase::AskForDampenersInstallation, Phase::CalibratingAccelerometer) => {
                self.dampeners_installed = true;
            }
            _ => {}
        }
    }

    /// Home, select the tool and park at the measurement position so the
    /// dampeners can be put on
    fn run_preparation(&mut self) -> WizardEvent {
        let belt_params = &self.engine.params().belt_systems[self.belt_system];
        let mut config = MeasurementConfig::from_belt_system(self.belt_system, belt_params);
        config.skip_tuning = true;

        // Setup-only run; no progress events are delivered
        let mut sink = |_event: &ProgressEvent| true;
        match self.engine.measure(&config, &mut sink) {
            Ok(_) => WizardEvent::PreparationDone,
            Err(err) => {
                self.last_error = Some(err);
                WizardEvent::MeasurementFailed
            }
        }
    }

    /// Calibrate (if configured) and run the sweep; setup was done by the
    /// preparation step
    fn run_measurement(&mut self) -> WizardEvent {
        let belt_params = &self.engine.params().belt_systems[self.belt_system];
        let mut config = MeasurementConfig::from_belt_system(self.belt_system, belt_params);
        config.skip_setup = true;
        config.calibrate_accelerometer = self.options.calibrate_accelerometer;

        self.graph.clear();
        let mut peak_amplitude = 0.0f32;

        // Split borrows: the sink owns mutable access to the presentation
        // state while the engine holds the hardware.
        let graph = &mut self.graph;
        let phase = &mut self.phase;
        let snapshot_tx = &self.snapshot_tx;
        let cancel_requested = &self.cancel_requested;
        let belt_system = self.belt_system;

        let mut sink = |event: &ProgressEvent| {
            // Calibration runs before the first report, so the phase flips
            // to Measuring here rather than before the engine call.
            *phase = Phase::Measuring;

            peak_amplitude = peak_amplitude.max(event.amplitude);
            let normalized = if peak_amplitude > 0.0 {
                event.amplitude / peak_amplitude
            } else {
                0.0
            };
            graph.push(event.overall_progress, normalized);

            let _ = snapshot_tx.send(PhaseSnapshot {
                phase: Phase::Measuring,
                belt_system,
                data: PhaseData::Measuring {
                    progress: event.overall_progress,
                    last_frequency_hz: event.frequency_hz,
                    last_amplitude: normalized,
                    graph: graph.as_array(),
                },
            });

            !cancel_requested.load(Ordering::Relaxed)
        };

        match self.engine.measure(&config, &mut sink) {
            Ok(Some(result)) => {
                self.last_result = Some(result);
                WizardEvent::MeasurementDone
            }
            // skip_tuning is never set here
            Ok(None) => {
                error!("[BeltTuningWizard] Sweep returned no result without skip_tuning");
                self.last_error = Some(MeasurementError::NoResonancePeakFound);
                WizardEvent::MeasurementFailed
            }
            Err(MeasurementError::Aborted) => WizardEvent::MeasurementAborted,
            Err(err) => {
                self.last_error = Some(err);
                WizardEvent::MeasurementFailed
            }
        }
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.snapshot());
    }

    fn phase_data(&self) -> PhaseData {
        match self.phase {
            Phase::CalibratingAccelerometer => PhaseData::Calibrating,
            Phase::Measuring => PhaseData::Measuring {
                progress: self.graph.filled() as f32 / GRAPH_WIDTH as f32,
                last_frequency_hz: 0.0,
                last_amplitude: 0.0,
                graph: self.graph.as_array(),
            },
            Phase::VibrationCheck | Phase::Results => match &self.last_result {
                Some(result) => {
                    let belt_params = &self.engine.params().belt_systems[result.belt_system];
                    let calculator = TensionCalculator::new(belt_params);
                    PhaseData::Results {
                        resonant_frequency_hz: result.resonant_frequency_hz,
                        tension_force_n: calculator.tension_force_n(result),
                        adjust_screw_turns: calculator.adjust_screw_turns(result),
                        target_tension_force_n: belt_params.target_tension_force_n,
                        target_tension_tolerance_n: belt_params.target_tension_tolerance_n,
                        graph: self.graph.as_array(),
                    }
                }
                None => PhaseData::Empty,
            },
            Phase::Error => match &self.last_error {
                Some(err) => PhaseData::Error {
                    code: err.code(),
                    message: err.message(),
                },
                None => PhaseData::Empty,
            },
            _ => PhaseData::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{RigHandle, SimulatedRig};
    use crate::params::{PrinterBeltParameters, PrinterVariant};

    fn wizard_with_rig(
        natural_frequency_hz: f32,
        variant: PrinterVariant,
        options: WizardOptions,
    ) -> (BeltTuningWizard, RigHandle) {
        let handle = RigHandle::new(SimulatedRig::new(natural_frequency_hz));
        let engine = MeasurementEngine::new(
            Box::new(handle.clone()),
            Box::new(handle.clone()),
            PrinterBeltParameters::for_variant(variant),
        );
        (BeltTuningWizard::new(engine, options), handle)
    }

    #[test]
    fn test_happy_path_reaches_results() {
        let (mut wizard, _rig) = wizard_with_rig(
            72.5,
            PrinterVariant::XlCoreXy,
            WizardOptions::default(),
        );
        assert_eq!(wizard.phase(), Phase::AskForGantryAlign);

        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::AskForDampenersInstallation);

        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::Results);

        match wizard.snapshot().data {
            PhaseData::Results {
                resonant_frequency_hz,
                tension_force_n,
                ..
            } => {
                assert_eq!(resonant_frequency_hz, 72.5);
                let params =
                    PrinterBeltParameters::for_variant(PrinterVariant::XlCoreXy);
                let expected = params.belt_systems[0].resonant_frequency_to_tension(72.5);
                assert_eq!(tension_force_n, expected);
            }
            other => panic!("expected results data, got {:?}", other),
        }

        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::AskForDampenersUninstallation);

        wizard.handle_response(UserResponse::Continue).unwrap();
        assert!(wizard.is_finished());
        assert!(!wizard.was_aborted());
    }

    #[test]
    fn test_snapshots_are_broadcast_during_the_sweep() {
        let (mut wizard, _rig) = wizard_with_rig(
            72.5,
            PrinterVariant::XlCoreXy,
            WizardOptions::default(),
        );
        let mut rx = wizard.subscribe();

        wizard.handle_response(UserResponse::Continue).unwrap();
        wizard.handle_response(UserResponse::Continue).unwrap();

        let mut measuring = 0usize;
        let mut saw_results = false;
        while let Ok(snapshot) = rx.try_recv() {
            match snapshot.data {
                PhaseData::Measuring { progress, .. } => {
                    measuring += 1;
                    assert!(progress > 0.0 && progress <= 1.0);
                }
                PhaseData::Results { .. } => saw_results = true,
                _ => {}
            }
        }
        assert_eq!(measuring, 91);
        assert!(saw_results);
    }

    #[test]
    fn test_calibration_phase_precedes_measuring() {
        let (mut wizard, _rig) = wizard_with_rig(
            72.5,
            PrinterVariant::XlCoreXy,
            WizardOptions::default(),
        );
        let mut rx = wizard.subscribe();

        wizard.handle_response(UserResponse::Continue).unwrap();
        wizard.handle_response(UserResponse::Continue).unwrap();

        let mut phases = Vec::new();
        while let Ok(snapshot) = rx.try_recv() {
            if phases.last() != Some(&snapshot.phase) {
                phases.push(snapshot.phase);
            }
        }
        let calibrating = phases
            .iter()
            .position(|p| *p == Phase::CalibratingAccelerometer)
            .expect("calibrating phase published");
        let measuring = phases
            .iter()
            .position(|p| *p == Phase::Measuring)
            .expect("measuring phase published");
        assert!(calibrating < measuring);
    }

    #[test]
    fn test_vibration_check_phase_when_enabled() {
        let options = WizardOptions {
            vibration_check: true,
            ..WizardOptions::default()
        };
        let (mut wizard, _rig) = wizard_with_rig(72.5, PrinterVariant::XlCoreXy, options);

        wizard.handle_response(UserResponse::Continue).unwrap();
        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::VibrationCheck);

        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::Results);
    }

    #[test]
    fn test_two_belt_systems_measured_in_turn() {
        let (mut wizard, _rig) = wizard_with_rig(
            75.0,
            PrinterVariant::BedslingerMk,
            WizardOptions::default(),
        );

        wizard.handle_response(UserResponse::Continue).unwrap();
        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::Results);
        assert_eq!(wizard.belt_system(), 0);

        // Second belt system skips the dampener ask
        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::Results);
        assert_eq!(wizard.belt_system(), 1);

        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::AskForDampenersUninstallation);
    }

    #[test]
    fn test_preparation_failure_enters_error_phase_and_retry_recovers() {
        let (mut wizard, rig) = wizard_with_rig(
            72.5,
            PrinterVariant::XlCoreXy,
            WizardOptions::default(),
        );
        rig.lock().fail_homing = true;

        wizard.handle_response(UserResponse::Continue).unwrap();
        assert_eq!(wizard.phase(), Phase::Error);
        match wizard.snapshot().data {
            PhaseData::Error { code, .. } => {
                assert_eq!(code, crate::error::MeasurementErrorCodes::SETUP_FAILED)
            }
            other => panic!("expected error data, got {:?}", other),
        }

        rig.lock().fail_homing = false;
        wizard.handle_response(UserResponse::Retry).unwrap();
        assert_eq!(wizard.phase(), Phase::AskForDampenersInstallation);
    }

    #[test]
    fn test_cancel_during_sweep_finishes_as_aborted() {
        let (mut wizard, _rig) = wizard_with_rig(
            72.5,
            PrinterVariant::XlCoreXy,
            WizardOptions::default(),
        );

        wizard.handle_response(UserResponse::Continue).unwrap();
        wizard.request_cancel();
        wizard.handle_response(UserResponse::Continue).unwrap();

        assert!(wizard.is_finished());
        assert!(wizard.was_aborted());
    }

    #[test]
    fn test_abort_response_finishes_as_aborted() {
        let (mut wizard, _rig) = wizard_with_rig(
            72.5,
            PrinterVariant::XlCoreXy,
            WizardOptions::default(),
        );

        wizard.handle_response(UserResponse::Abort).unwrap();
        assert!(wizard.is_finished());
        assert!(wizard.was_aborted());
    }

    #[test]
    fn test_unexpected_response_is_rejected_without_state_change() {
        let (mut wizard, _rig) = wizard_with_rig(
            72.5,
            PrinterVariant::XlCoreXy,
            WizardOptions::default(),
        );

        let err = wizard.handle_response(UserResponse::Retry).unwrap_err();
        assert_eq!(
            err,
            WizardError::UnexpectedResponse {
                phase: Phase::AskForGantryAlign,
                response: UserResponse::Retry,
            }
        );
        assert_eq!(wizard.phase(), Phase::AskForGantryAlign);
    }

    #[test]
    fn test_responses_after_done_are_rejected() {
        let (mut wizard, _rig) = wizard_with_rig(
            72.5,
            PrinterVariant::XlCoreXy,
            WizardOptions::default(),
        );
        wizard.handle_response(UserResponse::Abort).unwrap();

        let err = wizard.handle_response(UserResponse::Continue).unwrap_err();
        assert_eq!(err, WizardError::AlreadyFinished);
    }
}
