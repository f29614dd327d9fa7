//! Configuration management for the belt tuner
//!
//! This module provides runtime configuration loading from JSON files so the
//! printer variant, wizard behavior and sweep overrides can be adjusted
//! without recompilation. Missing or invalid files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::params::PrinterVariant;
use crate::wizard::WizardOptions;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Printer variant whose belt parameter table is used
    #[serde(default = "default_variant")]
    pub variant: PrinterVariant,
    #[serde(default)]
    pub wizard: WizardOptions,
    #[serde(default)]
    pub sweep_overrides: SweepOverrides,
}

fn default_variant() -> PrinterVariant {
    PrinterVariant::XlCoreXy
}

/// Optional overrides applied on top of the variant's default sweep
///
/// Only fields that are set replace the table value; everything else keeps
/// the variant default.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SweepOverrides {
    /// (Hz) Start frequency of the tuning scan
    pub start_frequency_hz: Option<f32>,
    /// (Hz) End frequency of the tuning scan, inclusive
    pub end_frequency_hz: Option<f32>,
    /// (Hz) Increment of the frequency sweep
    pub frequency_step_hz: Option<f32>,
    /// (1/frequency) Excitation sine periods per step
    pub excitation_cycles: Option<u32>,
    /// (meters) Fixed excitation amplitude; disables the amplitude ramp
    pub excitation_amplitude_m: Option<f32>,
}

impl SweepOverrides {
    /// Apply the set overrides to a measurement config
    pub fn apply(&self, config: &mut crate::measurement::MeasurementConfig) {
        if let Some(value) = self.start_frequency_hz {
            config.start_frequency_hz = value;
        }
        if let Some(value) = self.end_frequency_hz {
            config.end_frequency_hz = value;
        }
        if let Some(value) = self.frequency_step_hz {
            config.frequency_step_hz = value;
        }
        if let Some(value) = self.excitation_cycles {
            config.excitation_cycles = value;
        }
        if let Some(value) = self.excitation_amplitude_m {
            config.excitation_amplitude_m = value;
            config.amplitude_strategy = None;
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            variant: default_variant(),
            wizard: WizardOptions::default(),
            sweep_overrides: SweepOverrides::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the default config when the file is
    /// missing or not valid JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
