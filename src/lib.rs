//! Stress Score - SpO2 stress classification, score calibration and fusion
//!
//! The training pipeline turns per-subject SpO2 recordings into a bounded
//! stress score: windowed feature extraction → stratified split → logistic
//! regression → tanh score calibration → artifact encoding.
//!
//! ## Modules
//!
//! - **SpO2 Pipeline**: Train and apply the SpO2 stress model
//!   ([`train_spo2_model`], [`Spo2Scorer`])
//! - **Fusion**: Average per-modality score tables into one interpreted score
//!   ([`ScoreFuser`])

pub mod adapters;
pub mod calibration;
pub mod config;
#[cfg(feature = "cli")]
pub mod cli;
pub mod encoder;
pub mod error;
pub mod features;
pub mod fusion;
pub mod histogram;
pub mod metrics;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod split;
pub mod types;

pub use calibration::{CalibrationParams, ScoreCalibrator};
pub use config::{Alignment, ExtractorConfig, FusionConfig, ModelConfig, TrainerConfig};
pub use error::{ConfigError, StressError};
pub use features::FeatureExtractor;
pub use fusion::ScoreFuser;
pub use model::LogisticModel;
pub use pipeline::{train_spo2_model, Spo2Scorer, Spo2Trainer, TrainingReport};
pub use types::{FileOutcome, FusedScore, SkipReason, StressLevel};

/// Crate version embedded in all artifacts
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for artifacts
pub const PRODUCER_NAME: &str = "stress-score";
