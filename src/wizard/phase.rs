// Wizard phases, user responses and the transition table
//
// The table is a pure function from (phase, event, context) to the next
// phase plus an action for the wizard to execute. Keeping it free of side
// effects makes the whole workflow testable without hardware.

use serde::{Deserialize, Serialize};

/// Phase of the belt tuning workflow
///
/// `AskFor*` phases block on a user response; `Preparing`,
/// `CalibratingAccelerometer` and `Measuring` run hardware work and advance
/// on its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Confirm the gantry is aligned before any motion
    AskForGantryAlign,
    /// Homing, tool selection and moving to the measurement position
    Preparing,
    /// Tool is parked; waiting for the dampeners to be put on
    AskForDampenersInstallation,
    /// Accelerometer self-calibration before the sweep
    CalibratingAccelerometer,
    /// Frequency sweep in progress
    Measuring,
    /// Optional hands-on check of the detected resonance
    VibrationCheck,
    /// Presenting tension and adjustment for the measured belt system
    Results,
    /// All belt systems measured; waiting for the dampeners to come off
    AskForDampenersUninstallation,
    /// A measurement failed; waiting for retry or abort
    Error,
    /// Terminal phase, reached on completion or abort
    Done,
}

/// User response to a blocking wizard phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserResponse {
    Continue,
    Back,
    Retry,
    Abort,
}

/// Everything that can advance the wizard: user responses plus the outcomes
/// of hardware work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WizardEvent {
    Response(UserResponse),
    PreparationDone,
    MeasurementDone,
    MeasurementFailed,
    MeasurementAborted,
}

/// Work the wizard runs after entering the next phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    /// Home, select the tool and park at the measurement position
    RunPreparation,
    /// Calibrate (if configured) and run the sweep; setup is already done
    RunMeasurement,
}

/// Wizard state the transition table branches on
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransitionContext {
    /// Dampeners were confirmed installed earlier in this session
    pub dampeners_installed: bool,
    /// More belt systems remain after the one just measured
    pub more_belt_systems: bool,
    /// The vibration check phase is enabled
    pub vibration_check_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub next: Phase,
    pub action: Action,
}

fn to(next: Phase, action: Action) -> Option<Transition> {
    Some(Transition { next, action })
}

/// Resolve one event against the current phase
///
/// Returns `None` when the phase does not accept the event, which the
/// wizard reports as an unexpected response.
pub(crate) fn transition(
    phase: Phase,
    event: WizardEvent,
    ctx: &TransitionContext,
) -> Option<Transition> {
    use Phase::*;
    use UserResponse::*;
    use WizardEvent::*;

    match (phase, event) {
        (AskForGantryAlign, Response(Continue)) => to(Preparing, Action::RunPreparation),

        (Preparing, PreparationDone) => {
            if ctx.dampeners_installed {
                to(CalibratingAccelerometer, Action::RunMeasurement)
            } else {
                to(AskForDampenersInstallation, Action::None)
            }
        }

        (AskForDampenersInstallation, Response(Continue)) => {
            to(CalibratingAccelerometer, Action::RunMeasurement)
        }
        (AskForDampenersInstallation, Response(Back)) => to(AskForGantryAlign, Action::None),

        // The phase flips to Measuring on the first progress report, so a
        // completed sweep may report from either phase.
        (CalibratingAccelerometer | Measuring, MeasurementDone) => {
            if ctx.vibration_check_enabled {
                to(VibrationCheck, Action::None)
            } else {
                to(Results, Action::None)
            }
        }

        (VibrationCheck, Response(Continue)) => to(Results, Action::None),

        (Results, Response(Continue)) => {
            if ctx.more_belt_systems {
                to(Preparing, Action::RunPreparation)
            } else {
                to(AskForDampenersUninstallation, Action::None)
            }
        }

        (AskForDampenersUninstallation, Response(Continue)) => to(Done, Action::None),

        // A retry restarts the current belt system from the top, including
        // setup; the failure may have left the tool anywhere.
        (Error, Response(Retry)) => to(Preparing, Action::RunPreparation),

        (Preparing | CalibratingAccelerometer | Measuring, MeasurementFailed) => {
            to(Error, Action::None)
        }
        (CalibratingAccelerometer | Measuring, MeasurementAborted) => to(Done, Action::None),

        // Every blocking phase can be walked away from
        (
            AskForGantryAlign
            | AskForDampenersInstallation
            | VibrationCheck
            | Results
            | AskForDampenersUninstallation
            | Error,
            Response(Abort),
        ) => to(Done, Action::None),

        _ => None,
    }
}
