//! Core types for the stress scoring pipelines
//!
//! This module defines the data structures that flow through each stage:
//! window features, labeled datasets, per-file ingest outcomes, calibrated
//! score rows and fused scores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Number of components in every window feature vector
pub const FEATURE_COUNT: usize = 3;

/// Feature names in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["mean", "std", "below_fraction"];

/// Binary label for a stress window
pub const STRESS: u8 = 1;

/// Binary label for a non-stress window
pub const NON_STRESS: u8 = 0;

/// Features derived from one window of readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowFeatures {
    /// Mean reading in the window
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    /// Fraction of readings strictly below the threshold (0-1)
    pub below_fraction: f64,
}

impl WindowFeatures {
    /// Feature vector in `FEATURE_NAMES` order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [self.mean, self.std, self.below_fraction]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// A window with its features and threshold label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledWindow {
    /// Start index of the window in the source series
    pub start: usize,
    pub features: WindowFeatures,
    /// 1 when the window mean is below the threshold, else 0
    pub label: u8,
}

/// Accumulated feature matrix and labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<[f64; FEATURE_COUNT]>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append labeled windows to the dataset
    pub fn extend_windows(&mut self, windows: &[LabeledWindow]) {
        for window in windows {
            self.features.push(window.features.to_array());
            self.labels.push(window.label);
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Count of windows per class, indexed by label
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for &label in &self.labels {
            counts[usize::from(label.min(1))] += 1;
        }
        counts
    }

    /// Select rows by index, in the given order
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Reason a source file contributed no windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    /// The required column was not present
    MissingColumn { column: String },
    /// Fewer valid readings than one window needs
    TooFewSamples { count: usize, required: usize },
    /// Windowing produced nothing
    ZeroWindows,
    /// The file could not be read or parsed
    ReadError { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingColumn { column } => write!(f, "'{column}' column not found"),
            SkipReason::TooFewSamples { count, required } => {
                write!(f, "too few readings: {count} (need {required})")
            }
            SkipReason::ZeroWindows => write!(f, "no valid windows extracted"),
            SkipReason::ReadError { message } => write!(f, "read error: {message}"),
        }
    }
}

/// Outcome of ingesting a single source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FileOutcome {
    Loaded {
        path: PathBuf,
        samples: usize,
        windows: usize,
    },
    Skipped {
        path: PathBuf,
        #[serde(flatten)]
        reason: SkipReason,
    },
}

impl FileOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            FileOutcome::Loaded { path, .. } | FileOutcome::Skipped { path, .. } => path,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, FileOutcome::Loaded { .. })
    }
}

/// One calibrated row of the test-partition score table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(rename = "z-score")]
    pub z_score: f64,
    pub logit: f64,
    pub tanh_score: f64,
    pub true_label: u8,
    pub predicted: u8,
}

/// One window scored at inference time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredWindow {
    /// Source file name
    pub file: String,
    /// Start index of the window in the compacted series
    pub window: usize,
    #[serde(rename = "z-score")]
    pub z_score: f64,
    pub logit: f64,
    pub tanh_score: f64,
    /// Classifier probability of stress
    pub probability: f64,
    pub predicted: u8,
}

/// Three-way interpretation of a fused score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressLevel {
    #[serde(rename = "High Stress")]
    High,
    #[serde(rename = "Moderate Stress")]
    Moderate,
    #[serde(rename = "Non-Stress")]
    NonStress,
}

impl StressLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::High => "High Stress",
            StressLevel::Moderate => "Moderate Stress",
            StressLevel::NonStress => "Non-Stress",
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the fused score table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedScore {
    /// Shared key when tables were aligned by key column
    pub key: Option<String>,
    pub score: f64,
    pub interpretation: StressLevel,
}
