//! Configuration for the trainer, scorer and fuser.
//!
//! Defaults reproduce the reference constants: 60-sample windows with a
//! 30-sample stride, a 94% SpO2 threshold, an 80/20 split seeded with 42, and
//! the five modality score tables under `exports/`.

use crate::error::{ConfigError, StressError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default window length in samples
pub const DEFAULT_WINDOW: usize = 60;

/// Default stride between window starts
pub const DEFAULT_STRIDE: usize = 30;

/// SpO2 below this percentage is treated as stressed
pub const DEFAULT_THRESHOLD: f64 = 94.0;

/// Column holding SpO2 readings in the numerics files
pub const SPO2_COLUMN: &str = "SpO2";

/// Column holding calibrated scores in modality tables
pub const SCORE_COLUMN: &str = "tanh_score";

/// File name of the persisted classifier
pub const MODEL_FILE: &str = "spo2_stress_model.json";

/// File name of the persisted calibration parameters
pub const PARAMS_FILE: &str = "spo2_score_params.json";

/// Windowing parameters for feature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Window length in samples
    pub window: usize,
    /// Step between consecutive window starts
    pub stride: usize,
    /// Readings strictly below this count as dips; a window mean below it is labeled stress
    pub threshold: f64,
    /// Also emit a window that ends exactly at the last sample
    pub include_final_window: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            stride: DEFAULT_STRIDE,
            threshold: DEFAULT_THRESHOLD,
            include_final_window: false,
        }
    }
}

impl ExtractorConfig {
    pub fn new(window: usize, stride: usize, threshold: f64) -> Self {
        Self {
            window,
            stride,
            threshold,
            include_final_window: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::WindowTooSmall(self.window));
        }
        if self.stride == 0 {
            return Err(ConfigError::ZeroStride);
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::NonFiniteThreshold(self.threshold));
        }
        Ok(())
    }
}

/// Logistic regression hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Iteration cap for the solver
    pub max_iter: usize,
    /// Inverse L2 regularization strength
    pub c: f64,
    /// Convergence tolerance on the Newton step
    pub tol: f64,
    /// Weight classes inversely to their frequency
    pub balanced: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            c: 1.0,
            tol: 1e-4,
            balanced: true,
        }
    }
}

/// Full trainer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Directory scanned for `*_Numerics.csv` files
    pub input_dir: PathBuf,
    /// File name suffix that selects input files
    pub file_suffix: String,
    /// Column holding the readings
    pub column: String,
    pub extractor: ExtractorConfig,
    pub model: ModelConfig,
    /// Fraction of windows held out for testing
    pub test_fraction: f64,
    /// Seed for the stratified split
    pub seed: u64,
    /// Calibration center subtracted before scaling
    pub center: f64,
    /// Destination for model and calibration parameters
    pub models_dir: PathBuf,
    /// Destination for score tables
    pub exports_dir: PathBuf,
    /// Bins in the exported score histogram
    pub histogram_bins: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(
                "bidmc-ppg-and-respiration-dataset-1.0.0/bidmc-ppg-and-respiration-dataset-1.0.0/bidmc_csv",
            ),
            file_suffix: "_Numerics.csv".to_string(),
            column: SPO2_COLUMN.to_string(),
            extractor: ExtractorConfig::default(),
            model: ModelConfig::default(),
            test_fraction: 0.2,
            seed: 42,
            center: 0.5,
            models_dir: PathBuf::from("models"),
            exports_dir: PathBuf::from("exports"),
            histogram_bins: 40,
        }
    }
}

impl TrainerConfig {
    /// Load configuration from a JSON file; absent fields take defaults.
    pub fn load(path: &Path) -> Result<Self, StressError> {
        let content = std::fs::read_to_string(path)?;
        let config: TrainerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extractor.validate()?;
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::InvalidTestFraction(self.test_fraction));
        }
        if self.model.max_iter == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(MODEL_FILE)
    }

    pub fn params_path(&self) -> PathBuf {
        self.models_dir.join(PARAMS_FILE)
    }

    pub fn scores_path(&self) -> PathBuf {
        self.exports_dir.join("spo2_stress_scores.csv")
    }

    pub fn histogram_path(&self) -> PathBuf {
        self.exports_dir.join("spo2_score_histogram.csv")
    }
}

/// How modality score columns are lined up before averaging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "column")]
pub enum Alignment {
    /// Columns must have identical lengths
    #[default]
    Strict,
    /// Rows are joined on a shared key column
    ByKey(String),
    /// Later columns are cut to the first column's length
    TruncateToFirst,
}

/// Score fusion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Ordered modality score tables
    pub modality_files: Vec<PathBuf>,
    /// Column read from each table
    pub score_column: String,
    pub alignment: Alignment,
    /// Fused scores above this are high stress
    pub high_threshold: f64,
    /// Fused scores below this are non-stress
    pub low_threshold: f64,
    pub output: PathBuf,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            modality_files: [
                "behavior_stress_scores",
                "ppg_stress_scores",
                "spo2_stress_scores",
                "face_emotion_scores",
                "speech_emotion_scores",
            ]
            .iter()
            .map(|name| PathBuf::from("exports").join(format!("{name}.csv")))
            .collect(),
            score_column: SCORE_COLUMN.to_string(),
            alignment: Alignment::default(),
            high_threshold: 0.3,
            low_threshold: -0.3,
            output: PathBuf::from("exports/fused_stress_scores.csv"),
        }
    }
}

impl FusionConfig {
    /// Load configuration from a JSON file; absent fields take defaults.
    pub fn load(path: &Path) -> Result<Self, StressError> {
        let content = std::fs::read_to_string(path)?;
        let config: FusionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_threshold > self.high_threshold {
            return Err(ConfigError::InvertedThresholds {
                low: self.low_threshold,
                high: self.high_threshold,
            });
        }
        if let Alignment::ByKey(column) = &self.alignment {
            if column.trim().is_empty() {
                return Err(ConfigError::EmptyKeyColumn);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = TrainerConfig::default();
        assert_eq!(config.extractor.window, 60);
        assert_eq!(config.extractor.stride, 30);
        assert_eq!(config.extractor.threshold, 94.0);
        assert_eq!(config.seed, 42);
        assert_eq!(config.model.max_iter, 500);
        assert!(config.validate().is_ok());

        let fusion = FusionConfig::default();
        assert_eq!(fusion.modality_files.len(), 5);
        assert_eq!(
            fusion.modality_files[2],
            PathBuf::from("exports/spo2_stress_scores.csv")
        );
        assert_eq!(fusion.alignment, Alignment::Strict);
    }

    #[test]
    fn test_extractor_validation() {
        assert_eq!(
            ExtractorConfig::new(1, 1, 94.0).validate(),
            Err(ConfigError::WindowTooSmall(1))
        );
        assert_eq!(
            ExtractorConfig::new(3, 0, 94.0).validate(),
            Err(ConfigError::ZeroStride)
        );
        assert!(ExtractorConfig::new(3, 3, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainerConfig =
            serde_json::from_str(r#"{"extractor": {"window": 10}, "seed": 7}"#).unwrap();
        assert_eq!(config.extractor.window, 10);
        assert_eq!(config.extractor.stride, 30);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_alignment_json() {
        let config: FusionConfig =
            serde_json::from_str(r#"{"alignment": {"mode": "by_key", "column": "window"}}"#)
                .unwrap();
        assert_eq!(config.alignment, Alignment::ByKey("window".to_string()));

        let config: FusionConfig =
            serde_json::from_str(r#"{"alignment": {"mode": "strict"}}"#).unwrap();
        assert_eq!(config.alignment, Alignment::Strict);
    }

    #[test]
    fn test_fusion_validation() {
        let config = FusionConfig {
            low_threshold: 0.5,
            high_threshold: 0.3,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FusionConfig {
            alignment: Alignment::ByKey(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyKeyColumn));
    }
}
