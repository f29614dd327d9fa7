// Tension calculator - derived quantities from a measurement result
//
// Tension force and the tightening recommendation are computed on demand
// from the resonant frequency plus the matching belt system parameters;
// nothing derived is ever stored, so results cannot go stale when the
// parameter table changes between hardware revisions.

use crate::measurement::MeasurementResult;
use crate::params::BeltSystemParameters;

/// Computes tension force and screw-turn recommendations for one belt system
pub struct TensionCalculator<'a> {
    params: &'a BeltSystemParameters,
}

impl<'a> TensionCalculator<'a> {
    pub fn new(params: &'a BeltSystemParameters) -> Self {
        Self { params }
    }

    /// Force the belt is tensioned with, based on the resonant frequency
    pub fn tension_force_n(&self, result: &MeasurementResult) -> f32 {
        self.params
            .resonant_frequency_to_tension(result.resonant_frequency_hz)
    }

    /// Number of tensioner screw turns needed to reach the target tension
    ///
    /// Positive turns tighten (clockwise), negative turns loosen. Returns 0
    /// when the measured tension is within the configured tolerance of the
    /// target. The magnitude grows linearly with the tension deficit via the
    /// mechanism-specific `adjustment_turns_per_n` constant.
    pub fn adjust_screw_turns(&self, result: &MeasurementResult) -> f32 {
        let tension_n = self.tension_force_n(result);
        let deficit_n = self.params.target_tension_force_n - tension_n;

        if deficit_n.abs() <= self.params.target_tension_tolerance_n {
            return 0.0;
        }
        deficit_n * self.params.adjustment_turns_per_n
    }
}
