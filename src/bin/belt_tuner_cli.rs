use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use belt_tuner::hardware::sim::{RigHandle, SimulatedRig};
use belt_tuner::measurement::{MeasurementConfig, MeasurementEngine, ProgressEvent};
use belt_tuner::wizard::{BeltTuningWizard, PhaseData, PhaseSnapshot};
use belt_tuner::{
    AppConfig, Phase, PrinterBeltParameters, PrinterVariant, TensionCalculator, UserResponse,
};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "belt_tuner_cli",
    about = "Belt tension measurement harness on a simulated rig"
)]
struct Cli {
    /// Path to a JSON config file (defaults built in when missing)
    #[arg(long, default_value = "belt_tuner.json")]
    config: PathBuf,
    /// Printer variant; overrides the config file
    #[arg(long, value_enum)]
    variant: Option<PrinterVariant>,
    /// Resonant frequency of the simulated belt (Hz)
    #[arg(long, default_value_t = 72.5)]
    natural_frequency: f32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one frequency sweep and report the measured tension
    Measure {
        /// Belt system index within the variant
        #[arg(long, default_value_t = 0)]
        belt_system: usize,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the full calibration wizard, confirming every prompt
    Wizard,
    /// List printer variants and their belt systems
    Variants,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from_file(&cli.config);
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }

    match cli.command {
        Commands::Measure {
            belt_system,
            output,
        } => run_measure(&config, cli.natural_frequency, belt_system, output),
        Commands::Wizard => run_wizard(&config, cli.natural_frequency),
        Commands::Variants => run_variants(),
    }
}

fn simulated_engine(variant: PrinterVariant, natural_frequency: f32) -> MeasurementEngine {
    let handle = RigHandle::new(SimulatedRig::new(natural_frequency));
    MeasurementEngine::new(
        Box::new(handle.clone()),
        Box::new(handle),
        PrinterBeltParameters::for_variant(variant),
    )
}

fn run_measure(
    config: &AppConfig,
    natural_frequency: f32,
    belt_system: usize,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let params = PrinterBeltParameters::for_variant(config.variant);
    let belt_params = params
        .belt_systems
        .get(belt_system)
        .with_context(|| format!("variant {:?} has no belt system {}", config.variant, belt_system))?;

    let mut measurement = MeasurementConfig::from_belt_system(belt_system, belt_params);
    config.sweep_overrides.apply(&mut measurement);

    let mut engine = simulated_engine(config.variant, natural_frequency);
    let mut sink = |event: &ProgressEvent| {
        eprint!(
            "\rsweep {:>3.0}%  {:>6.1} Hz",
            event.overall_progress * 100.0,
            event.frequency_hz
        );
        true
    };
    let result = engine
        .measure(&measurement, &mut sink)
        .context("measurement failed")?
        .context("setup-only run returned no result")?;
    eprintln!();

    let calculator = TensionCalculator::new(belt_params);
    let report = MeasureReportPayload {
        variant: config.variant,
        belt_system,
        resonant_frequency_hz: result.resonant_frequency_hz,
        tension_force_n: calculator.tension_force_n(&result),
        target_tension_force_n: belt_params.target_tension_force_n,
        adjust_screw_turns: calculator.adjust_screw_turns(&result),
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(ExitCode::from(0))
}

fn run_wizard(config: &AppConfig, natural_frequency: f32) -> Result<ExitCode> {
    let engine = simulated_engine(config.variant, natural_frequency);
    let mut wizard = BeltTuningWizard::new(engine, config.wizard);
    let mut rx = wizard.subscribe();

    while !wizard.is_finished() {
        let response = match wizard.phase() {
            Phase::Error => UserResponse::Abort,
            _ => UserResponse::Continue,
        };
        wizard.handle_response(response)?;
        drain_snapshots(&mut rx);
    }

    if wizard.was_aborted() {
        println!("wizard aborted");
        return Ok(ExitCode::from(2));
    }
    println!("wizard finished");
    Ok(ExitCode::from(0))
}

fn drain_snapshots(rx: &mut tokio::sync::broadcast::Receiver<PhaseSnapshot>) {
    let mut last_phase = None;
    while let Ok(snapshot) = rx.try_recv() {
        match snapshot.data {
            PhaseData::Results {
                resonant_frequency_hz,
                tension_force_n,
                adjust_screw_turns,
                target_tension_force_n,
                ..
            } => {
                println!(
                    "belt system {}: {:.1} Hz, {:.1} N (target {:.1} N), adjust {:+.2} turns",
                    snapshot.belt_system,
                    resonant_frequency_hz,
                    tension_force_n,
                    target_tension_force_n,
                    adjust_screw_turns
                );
            }
            PhaseData::Error { code, message } => {
                eprintln!("error {code}: {message}");
            }
            _ => {
                if last_phase != Some(snapshot.phase) {
                    println!("phase: {:?}", snapshot.phase);
                    last_phase = Some(snapshot.phase);
                }
            }
        }
    }
}

fn run_variants() -> Result<ExitCode> {
    for variant in [
        PrinterVariant::XlCoreXy,
        PrinterVariant::IxCoreXy,
        PrinterVariant::BedslingerMk,
    ] {
        let params = PrinterBeltParameters::for_variant(variant);
        println!("{:?} ({} belt system(s))", variant, params.belt_system_count());
        for (index, belt) in params.belt_systems.iter().enumerate() {
            println!(
                "  [{}] sweep {:.0}-{:.0} Hz, target {:.0} N +/- {:.0} N",
                index,
                belt.sweep.start_frequency_hz,
                belt.sweep.end_frequency_hz,
                belt.target_tension_force_n,
                belt.target_tension_tolerance_n
            );
        }
    }
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct MeasureReportPayload {
    variant: PrinterVariant,
    belt_system: usize,
    resonant_frequency_hz: f32,
    tension_force_n: f32,
    target_tension_force_n: f32,
    adjust_screw_turns: f32,
}
