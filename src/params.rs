// Belt Parameter Model - per-hardware-variant physical constants
//
// This module holds the immutable physical description of every belt system
// a printer variant has, plus the tension/frequency conversions derived from
// the vibrating-string relation. The tables are selected once at startup
// from the detected hardware identity and never change afterwards.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::hardware::{ExcitationAxes, Position};

/// How the belts of a machine share tension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeltDriveTopology {
    /// CoreXY-style drives: two belts that share tension, one belt system
    Coupled,
    /// Independently tensioned belts (bedslinger), one system per belt
    Independent,
}

impl BeltDriveTopology {
    /// Number of mechanically independent belt systems
    pub fn belt_system_count(&self) -> usize {
        match self {
            BeltDriveTopology::Coupled => 1,
            BeltDriveTopology::Independent => 2,
        }
    }
}

/// Hardware identity the parameter tables are keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PrinterVariant {
    /// Large-format CoreXY machine
    XlCoreXy,
    /// Compact CoreXY machine
    IxCoreXy,
    /// Bedslinger with independently tensioned X and Y belts
    BedslingerMk,
}

impl PrinterVariant {
    pub fn topology(&self) -> BeltDriveTopology {
        match self {
            PrinterVariant::XlCoreXy | PrinterVariant::IxCoreXy => BeltDriveTopology::Coupled,
            PrinterVariant::BedslingerMk => BeltDriveTopology::Independent,
        }
    }
}

/// Anchor points for a linearly frequency-dependent excitation amplitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeAnchors {
    pub frequency_a_hz: f32,
    pub amplitude_a_m: f32,
    pub frequency_b_hz: f32,
    pub amplitude_b_m: f32,
}

/// Default sweep parameters for one belt system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepParams {
    /// (Hz) Start of the tuning scan, relates to the minimum detectable tension
    pub start_frequency_hz: f32,
    /// (Hz) End of the tuning scan, relates to the maximum detectable tension.
    /// Belts can arrive quite tight from the factory, so keep this high.
    pub end_frequency_hz: f32,
    /// (Hz) Increment of the frequency sweep
    pub frequency_step_hz: f32,
    /// (1/frequency) How many excitation sine periods to drive
    pub excitation_cycles: u32,
    /// (1/frequency) How many periods to wait after excitation
    pub wait_cycles: u32,
    /// (1/frequency) How many periods to measure for afterwards
    pub measurement_cycles: u32,
    /// Which harmonic of the excitation frequency is measured
    pub measured_harmonic: u16,
    /// (meters) Fixed excitation amplitude, used when no anchors are set
    pub excitation_amplitude_m: f32,
    /// Frequency-dependent amplitude; overrides the fixed amplitude when set
    pub amplitude_anchors: Option<AmplitudeAnchors>,
}

/// Physical description of one mechanically independent belt system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeltSystemParameters {
    /// Toolhead position at which measurements are performed
    pub measurement_pos: Position,
    /// Axes used for exciting this belt system
    pub excitation_axes: ExcitationAxes,
    /// (meters) Nominal length of the belt system
    pub nominal_length_m: f32,
    /// (kg/meter) Nominal linear mass density of a belt
    pub nominal_weight_kg_m: f32,
    /// (Newtons) Target tension force
    pub target_tension_force_n: f32,
    /// (Newtons) Acceptable deviation from the target tension
    pub target_tension_tolerance_n: f32,
    /// (turns/Newton) Tensioner screw turns per Newton of tension change.
    /// Mechanism-specific, calibrated against the screw pitch and stiffness.
    pub adjustment_turns_per_n: f32,
    /// Default parameters used for the tuning sweep
    pub sweep: SweepParams,
}

impl BeltSystemParameters {
    /// Belt tension from the resonant frequency
    ///
    /// Classic vibrating-string relation, T = 4 * rho * L^2 * f^2.
    /// See http://www.hyperphysics.gsu.edu/hbase/Waves/string.html
    pub fn resonant_frequency_to_tension(&self, resonant_frequency_hz: f32) -> f32 {
        4.0 * self.nominal_weight_kg_m
            * self.nominal_length_m
            * self.nominal_length_m
            * resonant_frequency_hz
            * resonant_frequency_hz
    }

    /// Resonant frequency from the belt tension, the exact inverse for T >= 0
    pub fn tension_to_resonant_frequency(&self, tension_n: f32) -> f32 {
        (tension_n.max(0.0)
            / (4.0 * self.nominal_weight_kg_m * self.nominal_length_m * self.nominal_length_m))
            .sqrt()
    }
}

/// The full belt parameter table of one printer variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterBeltParameters {
    pub variant: PrinterVariant,
    pub belt_systems: Vec<BeltSystemParameters>,
}

impl PrinterBeltParameters {
    /// Look up the immutable parameter table for a hardware variant
    pub fn for_variant(variant: PrinterVariant) -> &'static PrinterBeltParameters {
        match variant {
            PrinterVariant::XlCoreXy => &XL_CORE_XY,
            PrinterVariant::IxCoreXy => &IX_CORE_XY,
            PrinterVariant::BedslingerMk => &BEDSLINGER_MK,
        }
    }

    pub fn belt_system_count(&self) -> usize {
        self.belt_systems.len()
    }
}

static XL_CORE_XY: Lazy<PrinterBeltParameters> = Lazy::new(|| PrinterBeltParameters {
    variant: PrinterVariant::XlCoreXy,
    belt_systems: vec![BeltSystemParameters {
        measurement_pos: Position::new(342.0, 110.0, 10.0),
        // Vibrate the toolhead front and back
        excitation_axes: ExcitationAxes::core_xy_front_back(),
        nominal_length_m: 0.395,
        nominal_weight_kg_m: 0.007569,
        target_tension_force_n: 18.0,
        target_tension_tolerance_n: 1.0,
        adjustment_turns_per_n: 0.25,
        sweep: SweepParams {
            start_frequency_hz: 50.0,
            end_frequency_hz: 95.0,
            frequency_step_hz: 0.5,
            excitation_cycles: 50,
            wait_cycles: 1,
            measurement_cycles: 30,
            measured_harmonic: 2,
            excitation_amplitude_m: 7e-5,
            amplitude_anchors: Some(AmplitudeAnchors {
                frequency_a_hz: 50.0,
                amplitude_a_m: 5e-5,
                frequency_b_hz: 95.0,
                amplitude_b_m: 9e-5,
            }),
        },
    }],
});

static IX_CORE_XY: Lazy<PrinterBeltParameters> = Lazy::new(|| PrinterBeltParameters {
    variant: PrinterVariant::IxCoreXy,
    belt_systems: vec![BeltSystemParameters {
        measurement_pos: Position::new(257.0, 8.0, 10.0),
        excitation_axes: ExcitationAxes::core_xy_front_back(),
        nominal_length_m: 0.300,
        nominal_weight_kg_m: 0.007569,
        target_tension_force_n: 18.0,
        target_tension_tolerance_n: 1.0,
        adjustment_turns_per_n: 0.25,
        sweep: SweepParams {
            start_frequency_hz: 75.0,
            end_frequency_hz: 105.0,
            frequency_step_hz: 0.5,
            excitation_cycles: 40,
            wait_cycles: 1,
            measurement_cycles: 30,
            measured_harmonic: 2,
            excitation_amplitude_m: 8e-5,
            amplitude_anchors: Some(AmplitudeAnchors {
                frequency_a_hz: 75.0,
                amplitude_a_m: 7e-5,
                frequency_b_hz: 105.0,
                amplitude_b_m: 9e-5,
            }),
        },
    }],
});

static BEDSLINGER_MK: Lazy<PrinterBeltParameters> = Lazy::new(|| PrinterBeltParameters {
    variant: PrinterVariant::BedslingerMk,
    belt_systems: vec![
        // X belt
        BeltSystemParameters {
            measurement_pos: Position::new(125.0, 105.0, 10.0),
            excitation_axes: ExcitationAxes::x_only(),
            nominal_length_m: 0.42,
            nominal_weight_kg_m: 0.007569,
            target_tension_force_n: 12.0,
            target_tension_tolerance_n: 1.0,
            adjustment_turns_per_n: 0.3,
            sweep: SweepParams {
                start_frequency_hz: 60.0,
                end_frequency_hz: 100.0,
                frequency_step_hz: 0.5,
                excitation_cycles: 40,
                wait_cycles: 1,
                measurement_cycles: 30,
                measured_harmonic: 2,
                excitation_amplitude_m: 8e-5,
                amplitude_anchors: None,
            },
        },
        // Y belt
        BeltSystemParameters {
            measurement_pos: Position::new(125.0, 210.0, 10.0),
            excitation_axes: ExcitationAxes::y_only(),
            nominal_length_m: 0.50,
            nominal_weight_kg_m: 0.007569,
            target_tension_force_n: 12.0,
            target_tension_tolerance_n: 1.0,
            adjustment_turns_per_n: 0.3,
            sweep: SweepParams {
                start_frequency_hz: 55.0,
                end_frequency_hz: 95.0,
                frequency_step_hz: 0.5,
                excitation_cycles: 40,
                wait_cycles: 1,
                measurement_cycles: 30,
                measured_harmonic: 2,
                excitation_amplitude_m: 8e-5,
                amplitude_anchors: None,
            },
        },
    ],
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_belt_system_count() {
        assert_eq!(BeltDriveTopology::Coupled.belt_system_count(), 1);
        assert_eq!(BeltDriveTopology::Independent.belt_system_count(), 2);
    }

    #[test]
    fn test_tables_match_topology() {
        for variant in [
            PrinterVariant::XlCoreXy,
            PrinterVariant::IxCoreXy,
            PrinterVariant::BedslingerMk,
        ] {
            let params = PrinterBeltParameters::for_variant(variant);
            assert_eq!(params.variant, variant);
            assert_eq!(
                params.belt_system_count(),
                variant.topology().belt_system_count(),
                "belt system count mismatch for {:?}",
                variant
            );
        }
    }

    #[test]
    fn test_tension_conversion_round_trip() {
        let params = &PrinterBeltParameters::for_variant(PrinterVariant::XlCoreXy).belt_systems[0];
        for frequency_hz in [0.0f32, 50.0, 72.5, 85.0, 95.0] {
            let tension = params.resonant_frequency_to_tension(frequency_hz);
            let back = params.tension_to_resonant_frequency(tension);
            assert!(
                (back - frequency_hz).abs() < 1e-3,
                "round trip failed: {} -> {} -> {}",
                frequency_hz,
                tension,
                back
            );
        }
    }

    #[test]
    fn test_tension_conversion_monotonic() {
        let params = &PrinterBeltParameters::for_variant(PrinterVariant::IxCoreXy).belt_systems[0];
        let mut previous = -1.0f32;
        for frequency_hz in [10.0f32, 40.0, 75.0, 90.0, 105.0] {
            let tension = params.resonant_frequency_to_tension(frequency_hz);
            assert!(tension > previous);
            previous = tension;
        }
    }

    #[test]
    fn test_negative_tension_clamped() {
        let params = &PrinterBeltParameters::for_variant(PrinterVariant::XlCoreXy).belt_systems[0];
        assert_eq!(params.tension_to_resonant_frequency(-5.0), 0.0);
    }

    #[test]
    fn test_xl_sweep_defaults() {
        let sweep = PrinterBeltParameters::for_variant(PrinterVariant::XlCoreXy).belt_systems[0].sweep;
        assert_eq!(sweep.start_frequency_hz, 50.0);
        assert_eq!(sweep.end_frequency_hz, 95.0);
        assert_eq!(sweep.frequency_step_hz, 0.5);
        assert_eq!(sweep.measured_harmonic, 2);
        assert!(sweep.amplitude_anchors.is_some());
    }
}
