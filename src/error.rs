//! Error types for stress scoring

use thiserror::Error;

/// Errors that can occur while training, calibrating or fusing scores
#[derive(Debug, Error)]
pub enum StressError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Failed to parse value '{value}' in column '{column}' at row {row}")]
    ParseValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("No valid data found")]
    NoValidData,

    #[error("Insufficient classes for stratified split: {0}")]
    InsufficientClasses(String),

    #[error("Model fitting error: {0}")]
    ModelError(String),

    #[error("Calibration error: {0}")]
    CalibrationError(String),

    #[error("Score tables are misaligned: {0}")]
    MisalignedScores(String),

    #[error("No modality score tables to fuse")]
    NoModalities,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window size must be at least 2, got {0}")]
    WindowTooSmall(usize),

    #[error("stride must be positive")]
    ZeroStride,

    #[error("threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),

    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidTestFraction(f64),

    #[error("iteration cap must be positive")]
    ZeroIterations,

    #[error("fusion thresholds must satisfy low <= high, got low={low} high={high}")]
    InvertedThresholds { low: f64, high: f64 },

    #[error("key alignment requires a non-empty key column")]
    EmptyKeyColumn,
}
