//! Score calibration
//!
//! Maps classifier probabilities onto a bounded, symmetric stress score:
//!
//! 1. Reduce each feature vector to its row mean and z-score it with
//!    statistics fit on the training partition.
//! 2. Fit a 1-D least-squares line `z -> training probability` (slope alpha,
//!    intercept beta).
//! 3. `logit = alpha * z + beta` for both partitions.
//! 4. `scale = 2 / P95(|logit_train - center|)`, which puts the bulk of the
//!    training logits in roughly [-2, 2].
//! 5. `score = tanh(scale * (logit_test - center))`.
//!
//! The score is a monotonic reparametrization of a single derived feature, not
//! of the full model; that simplification is intentional.

use crate::error::StressError;
use crate::normalizer::ZScoreNormalizer;
use crate::types::FEATURE_COUNT;
use serde::{Deserialize, Serialize};

/// Default calibration center
pub const DEFAULT_CENTER: f64 = 0.5;

/// Percentile of absolute training deviations mapped to +/-2
pub const SCALE_PERCENTILE: f64 = 95.0;

/// Parameters needed to reproduce a calibrated score at inference time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Regression slope
    pub alpha: f64,
    /// Regression intercept
    pub beta: f64,
    /// Multiplier applied before tanh
    pub scale: f64,
    pub center: f64,
    /// Training mean of the feature row means
    pub z_mean: f64,
    /// Training standard deviation of the feature row means
    pub z_scale: f64,
}

impl CalibrationParams {
    pub fn normalizer(&self) -> ZScoreNormalizer {
        ZScoreNormalizer {
            mean: self.z_mean,
            scale: self.z_scale,
        }
    }

    pub fn z_score(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        self.normalizer().transform_one(row_mean(features))
    }

    pub fn logit(&self, z: f64) -> f64 {
        self.alpha * z + self.beta
    }

    pub fn score(&self, logit: f64) -> f64 {
        tanh_score(logit, self.scale, self.center)
    }

    /// Full chain from features to score: (z, logit, score)
    pub fn score_features(&self, features: &[f64; FEATURE_COUNT]) -> (f64, f64, f64) {
        let z = self.z_score(features);
        let logit = self.logit(z);
        (z, logit, self.score(logit))
    }
}

/// Calibrated outputs for both partitions
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub params: CalibrationParams,
    pub z_train: Vec<f64>,
    pub z_test: Vec<f64>,
    pub logit_train: Vec<f64>,
    pub logit_test: Vec<f64>,
    /// Test partition scores in (-1, 1)
    pub scores: Vec<f64>,
}

/// Calibrator turning probabilities into tanh scores
#[derive(Debug, Clone, Copy)]
pub struct ScoreCalibrator {
    center: f64,
}

impl Default for ScoreCalibrator {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER)
    }
}

impl ScoreCalibrator {
    pub fn new(center: f64) -> Self {
        Self { center }
    }

    /// Fit on the training partition and score the test partition
    pub fn calibrate(
        &self,
        x_train: &[[f64; FEATURE_COUNT]],
        x_test: &[[f64; FEATURE_COUNT]],
        y_train: &[u8],
        probs_train: &[f64],
        probs_test: &[f64],
    ) -> Result<Calibration, StressError> {
        if x_train.len() != y_train.len() || x_train.len() != probs_train.len() {
            return Err(StressError::CalibrationError(format!(
                "training partition mismatch: {} rows, {} labels, {} probabilities",
                x_train.len(),
                y_train.len(),
                probs_train.len()
            )));
        }
        if x_test.len() != probs_test.len() {
            return Err(StressError::CalibrationError(format!(
                "test partition mismatch: {} rows, {} probabilities",
                x_test.len(),
                probs_test.len()
            )));
        }

        let means_train: Vec<f64> = x_train.iter().map(row_mean).collect();
        let means_test: Vec<f64> = x_test.iter().map(row_mean).collect();

        let normalizer = ZScoreNormalizer::fit(&means_train)?;
        let z_train = normalizer.transform(&means_train);
        let z_test = normalizer.transform(&means_test);

        let (alpha, beta) = fit_line(&z_train, probs_train);

        let logit_train: Vec<f64> = z_train.iter().map(|z| alpha * z + beta).collect();
        let logit_test: Vec<f64> = z_test.iter().map(|z| alpha * z + beta).collect();

        let deviations: Vec<f64> = logit_train
            .iter()
            .map(|l| (l - self.center).abs())
            .collect();
        let spread = percentile(&deviations, SCALE_PERCENTILE).ok_or_else(|| {
            StressError::CalibrationError("no training logits to scale".to_string())
        })?;
        if !(spread.is_finite() && spread > 0.0) {
            return Err(StressError::CalibrationError(format!(
                "95th percentile of |logit - center| is {spread}; scale would be unbounded"
            )));
        }
        let scale = 2.0 / spread;

        let scores: Vec<f64> = logit_test
            .iter()
            .map(|&l| tanh_score(l, scale, self.center))
            .collect();

        tracing::debug!(alpha, beta, scale, spread, "score calibration fitted");

        Ok(Calibration {
            params: CalibrationParams {
                alpha,
                beta,
                scale,
                center: self.center,
                z_mean: normalizer.mean,
                z_scale: normalizer.scale,
            },
            z_train,
            z_test,
            logit_train,
            logit_test,
            scores,
        })
    }
}

/// Mean of one feature vector
pub fn row_mean(features: &[f64; FEATURE_COUNT]) -> f64 {
    features.iter().sum::<f64>() / FEATURE_COUNT as f64
}

/// Bounded score: `tanh(scale * (logit - center))`
pub fn tanh_score(logit: f64, scale: f64, center: f64) -> f64 {
    (scale * (logit - center)).tanh()
}

/// Ordinary least squares for `y = slope * x + intercept`.
///
/// Constant `x` gives slope 0 and the mean of `y` as intercept.
pub fn fit_line(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    if n == 0 {
        return (0.0, 0.0);
    }
    let x_mean = x[..n].iter().sum::<f64>() / n as f64;
    let y_mean = y[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (xi, yi) in x[..n].iter().zip(&y[..n]) {
        cov += (xi - x_mean) * (yi - y_mean);
        var += (xi - x_mean) * (xi - x_mean);
    }

    let slope = if var > 0.0 { cov / var } else { 0.0 };
    (slope, y_mean - slope * x_mean)
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is in [0, 100]; rank is `q / 100 * (n - 1)`.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
