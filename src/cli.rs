//! Shared command-line plumbing
//!
//! Logging setup and the structured error printed by every binary.

use crate::error::StressError;
use serde::Serialize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Structured error printed to stderr on failure
#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

impl From<StressError> for CliError {
    fn from(e: StressError) -> Self {
        let (code, hint) = match &e {
            StressError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
            StressError::Csv(_) => ("CSV_ERROR", "Check that the input is a well-formed CSV file"),
            StressError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
            StressError::Config(_) => ("CONFIG_ERROR", "Fix the configuration value and retry"),
            StressError::MissingColumn { .. } => (
                "MISSING_COLUMN",
                "Check the column name and the file headers",
            ),
            StressError::ParseValue { .. } => ("PARSE_ERROR", "Cells must be numeric or blank"),
            StressError::NoValidData => (
                "NO_VALID_DATA",
                "Ensure the input directory holds numerics files with enough SpO2 readings",
            ),
            StressError::InsufficientClasses(_) => (
                "INSUFFICIENT_CLASSES",
                "Add recordings with both normal and low SpO2 or adjust the threshold",
            ),
            StressError::ModelError(_) => (
                "MODEL_ERROR",
                "Check the training data for degenerate features",
            ),
            StressError::CalibrationError(_) => (
                "CALIBRATION_ERROR",
                "Training logits have no spread; check the training data",
            ),
            StressError::MisalignedScores(_) => (
                "MISALIGNED_SCORES",
                "Use --alignment key with a shared key column, or --alignment truncate",
            ),
            StressError::NoModalities => ("NO_MODALITIES", "Pass at least one modality score file"),
        };

        CliError {
            code: code.to_string(),
            message: e.to_string(),
            hint: Some(hint.to_string()),
        }
    }
}

/// Print the error as JSON on stderr and return a failing exit code
pub fn exit_with(e: StressError) -> ExitCode {
    eprintln!(
        "{}",
        serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
    );
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let error = CliError::from(StressError::NoValidData);
        assert_eq!(error.code, "NO_VALID_DATA");
        assert!(error.hint.is_some());

        let json = serde_json::to_value(CliError::from(StressError::NoModalities)).unwrap();
        assert_eq!(json["code"], "NO_MODALITIES");
        assert_eq!(json["message"], "No modality score tables to fuse");
    }
}
