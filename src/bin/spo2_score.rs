//! spo2-score - Score new SpO2 recordings with a trained model
//!
//! Reloads `spo2_stress_model.json` and `spo2_score_params.json` and writes
//! one calibrated score per window.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use stress_score::cli::{exit_with, init_tracing};
use stress_score::encoder;
use stress_score::pipeline::list_inputs;
use stress_score::{Spo2Scorer, StressError, TrainerConfig, VERSION};

/// Apply the persisted SpO2 model and calibration to numerics files
#[derive(Parser)]
#[command(name = "spo2-score")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Score SpO2 recordings with a trained model", long_about = None)]
struct Cli {
    /// Directory holding the model and calibration parameters
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,

    /// Output score table
    #[arg(long, default_value = "exports/spo2_window_scores.csv")]
    output: PathBuf,

    /// Column holding SpO2 readings
    #[arg(long, default_value = "SpO2")]
    column: String,

    /// Numerics files to score; defaults to the training input directory
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => exit_with(e),
    }
}

fn run(cli: Cli) -> Result<(), StressError> {
    let scorer = Spo2Scorer::load(&cli.models_dir)?.with_column(cli.column);

    let inputs = if cli.inputs.is_empty() {
        let defaults = TrainerConfig::default();
        list_inputs(&defaults.input_dir, &defaults.file_suffix)?
    } else {
        cli.inputs
    };

    let (scored, outcomes) = scorer.score_files(&inputs);
    if scored.is_empty() {
        return Err(StressError::NoValidData);
    }

    encoder::write_scored_windows(&cli.output, &scored)?;

    let loaded = outcomes.iter().filter(|o| o.is_loaded()).count();
    println!("Scored {} windows from {} of {} files", scored.len(), loaded, outcomes.len());
    println!("Saved {}", cli.output.display());
    Ok(())
}
