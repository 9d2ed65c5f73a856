//! stress-fuse - Fuse per-modality stress scores
//!
//! With no arguments, averages the five modality score tables under
//! `exports/` and writes `exports/fused_stress_scores.csv`.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use stress_score::cli::{exit_with, init_tracing};
use stress_score::{Alignment, FusionConfig, ScoreFuser, StressError, StressLevel, VERSION};

/// Average modality tanh scores and interpret the result
#[derive(Parser)]
#[command(name = "stress-fuse")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Fuse per-modality stress scores", long_about = None)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file for the fused table
    #[arg(long)]
    output: Option<PathBuf>,

    /// How score columns are lined up
    #[arg(long)]
    alignment: Option<AlignmentMode>,

    /// Key column shared by every table (implies --alignment key)
    #[arg(long)]
    key: Option<String>,

    /// Modality score tables, in order
    modality_files: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlignmentMode {
    /// Tables must have the same number of rows
    Strict,
    /// Join rows on --key
    Key,
    /// Cut every table to the first table's length
    Truncate,
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
        Some(path) => FusionConfig::load(path)?,
        None => FusionConfig::default(),
    };

    if !cli.modality_files.is_empty() {
        config.modality_files = cli.modality_files;
    }
    if let Some(output) = cli.output {
        config.output = output;
    }

    let mode = match (cli.alignment, &cli.key) {
        (Some(mode), _) => Some(mode),
        (None, Some(_)) => Some(AlignmentMode::Key),
        (None, None) => None,
    };
    if let Some(mode) = mode {
        config.alignment = match mode {
            AlignmentMode::Strict => Alignment::Strict,
            AlignmentMode::Truncate => Alignment::TruncateToFirst,
            AlignmentMode::Key => Alignment::ByKey(cli.key.unwrap_or_default()),
        };
    }

    let fuser = ScoreFuser::new(config)?;
    let fused = fuser.run()?;

    let count = |level: StressLevel| fused.iter().filter(|f| f.interpretation == level).count();
    println!("Fused {} rows", fused.len());
    for level in [StressLevel::High, StressLevel::Moderate, StressLevel::NonStress] {
        println!("  {:<16} {}", level.as_str(), count(level));
    }
    println!("Saved {}", fuser.config().output.display());
    Ok(())
}
