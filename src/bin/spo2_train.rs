//! spo2-train - Train and calibrate the SpO2 stress model
//!
//! With no arguments, reads the BIDMC numerics directory and writes the model,
//! calibration parameters and score tables under `models/` and `exports/`.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use stress_score::cli::{exit_with, init_tracing};
use stress_score::{FileOutcome, Spo2Trainer, StressError, TrainerConfig, TrainingReport, VERSION};

/// Train the SpO2 stress classifier and calibrate its tanh score
#[derive(Parser)]
#[command(name = "spo2-train")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Train and calibrate the SpO2 stress model", long_about = None)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding *_Numerics.csv files
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Output directory for the model and calibration parameters
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Output directory for score tables
    #[arg(long)]
    exports_dir: Option<PathBuf>,

    /// Window length in samples
    #[arg(long)]
    window: Option<usize>,

    /// Step between window starts
    #[arg(long)]
    stride: Option<usize>,

    /// SpO2 threshold in percent
    #[arg(long)]
    threshold: Option<f64>,

    /// Seed for the train/test split
    #[arg(long)]
    seed: Option<u64>,

    /// Also emit a window ending exactly at the last reading
    #[arg(long)]
    include_final_window: bool,

    /// Print the training report as JSON
    #[arg(long)]
    json: bool,
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
    let mut config = match &cli.config {
        Some(path) => TrainerConfig::load(path)?,
        None => TrainerConfig::default(),
    };

    if let Some(dir) = cli.input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = cli.models_dir {
        config.models_dir = dir;
    }
    if let Some(dir) = cli.exports_dir {
        config.exports_dir = dir;
    }
    if let Some(window) = cli.window {
        config.extractor.window = window;
    }
    if let Some(stride) = cli.stride {
        config.extractor.stride = stride;
    }
    if let Some(threshold) = cli.threshold {
        config.extractor.threshold = threshold;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if cli.include_final_window {
        config.extractor.include_final_window = true;
    }

    let report = Spo2Trainer::new(config)?.run()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &TrainingReport) {
    let loaded = report.files.iter().filter(|f| f.is_loaded()).count();
    println!("Files: {} loaded, {} skipped", loaded, report.files.len() - loaded);
    for file in &report.files {
        if let FileOutcome::Skipped { path, reason } = file {
            println!("  skipped {}: {}", path.display(), reason);
        }
    }
    println!(
        "Windows: {} ({} non-stress, {} stress); train {}, test {}",
        report.windows,
        report.class_counts[0],
        report.class_counts[1],
        report.train_size,
        report.test_size
    );
    println!();
    println!("{}", report.report);

    let params = &report.params;
    println!(
        "Calibration: alpha={:.4} beta={:.4} scale={:.4} center={}",
        params.alpha, params.beta, params.scale, params.center
    );
    println!();
    print!("{}", report.histogram);
    println!();
    for path in &report.artifacts {
        println!("Saved {}", path.display());
    }
}
