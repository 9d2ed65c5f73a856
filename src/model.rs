//! Logistic regression classifier
//!
//! Binary logistic regression over window features, fitted by Newton-Raphson
//! (iteratively reweighted least squares) on the L2-penalized, sample-weighted
//! log-loss:
//!
//! ```text
//! 0.5 * ||w||^2 + C * sum_i s_i * [log(1 + exp(z_i)) - y_i * z_i],  z_i = w.x_i + b
//! ```
//!
//! The intercept is not penalized. With balanced class weighting each sample
//! of class `c` gets `s_i = n / (2 * n_c)`, so the minority class counts as
//! much as the majority.

use crate::config::ModelConfig;
use crate::error::StressError;
use crate::types::{FEATURE_COUNT, NON_STRESS, STRESS};
use serde::{Deserialize, Serialize};

/// Coefficients plus intercept
const PARAMS: usize = FEATURE_COUNT + 1;

/// Halvings allowed when a full Newton step does not decrease the loss
const MAX_BACKTRACKS: usize = 30;

/// Fitted logistic regression model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Feature coefficients in `FEATURE_NAMES` order
    pub coefficients: [f64; FEATURE_COUNT],
    pub intercept: f64,
    /// Per-class sample weights used during fitting, indexed by label
    pub class_weights: [f64; 2],
    /// Solver iterations performed
    pub iterations: usize,
    /// Whether the step tolerance was reached before the iteration cap
    pub converged: bool,
}

/// Numerically stable sigmoid.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let ez = z.exp();
        ez / (1.0 + ez)
    }
}

/// `log(1 + exp(z))` without overflow
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// Class weights inversely proportional to class frequency
pub fn balanced_class_weights(labels: &[u8]) -> [f64; 2] {
    let n = labels.len() as f64;
    let stress = labels.iter().filter(|&&l| l == STRESS).count() as f64;
    let non_stress = n - stress;

    let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 0.0 };
    [weight(non_stress), weight(stress)]
}

impl LogisticModel {
    /// Fit the model on a feature matrix and binary labels
    pub fn fit(
        features: &[[f64; FEATURE_COUNT]],
        labels: &[u8],
        config: &ModelConfig,
    ) -> Result<Self, StressError> {
        if features.is_empty() || features.len() != labels.len() {
            return Err(StressError::ModelError(format!(
                "need matching non-empty features and labels, got {} rows and {} labels",
                features.len(),
                labels.len()
            )));
        }
        if labels.iter().all(|&l| l == labels[0]) {
            return Err(StressError::ModelError(
                "training data contains a single class".to_string(),
            ));
        }

        let class_weights = if config.balanced {
            balanced_class_weights(labels)
        } else {
            [1.0, 1.0]
        };
        let sample_weights: Vec<f64> = labels
            .iter()
            .map(|&l| class_weights[usize::from(l.min(1))])
            .collect();

        let mut theta = [0.0; PARAMS];
        let mut loss = objective(&theta, features, labels, &sample_weights, config.c);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < config.max_iter {
            iterations += 1;

            let (gradient, hessian) =
                derivatives(&theta, features, labels, &sample_weights, config.c);
            let step = solve(hessian, gradient).ok_or_else(|| {
                StressError::ModelError("singular Hessian during Newton step".to_string())
            })?;

            let mut scale = 1.0;
            let mut candidate = apply_step(&theta, &step, scale);
            let mut candidate_loss =
                objective(&candidate, features, labels, &sample_weights, config.c);
            let mut backtracks = 0;
            while candidate_loss > loss && backtracks < MAX_BACKTRACKS {
                scale *= 0.5;
                candidate = apply_step(&theta, &step, scale);
                candidate_loss = objective(&candidate, features, labels, &sample_weights, config.c);
                backtracks += 1;
            }

            theta = candidate;
            loss = candidate_loss;

            let step_norm = step.iter().map(|s| (s * scale).abs()).fold(0.0, f64::max);
            if step_norm < config.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                max_iter = config.max_iter,
                "logistic regression did not converge; increase the iteration cap"
            );
        }
        tracing::debug!(iterations, loss, ?theta, "logistic regression fitted");

        let mut coefficients = [0.0; FEATURE_COUNT];
        coefficients.copy_from_slice(&theta[..FEATURE_COUNT]);

        Ok(Self {
            coefficients,
            intercept: theta[FEATURE_COUNT],
            class_weights,
            iterations,
            converged,
        })
    }

    /// Linear decision value `w.x + b`
    pub fn decision(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        self.coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }

    /// Probability of the stress class
    pub fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        sigmoid(self.decision(features))
    }

    pub fn predict_proba_batch(&self, features: &[[f64; FEATURE_COUNT]]) -> Vec<f64> {
        features.iter().map(|x| self.predict_proba(x)).collect()
    }

    /// Predicted label at the 0.5 probability threshold
    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> u8 {
        if self.decision(features) > 0.0 {
            STRESS
        } else {
            NON_STRESS
        }
    }

    pub fn predict_batch(&self, features: &[[f64; FEATURE_COUNT]]) -> Vec<u8> {
        features.iter().map(|x| self.predict(x)).collect()
    }

    /// Load a model from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the model to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn linear(theta: &[f64; PARAMS], x: &[f64; FEATURE_COUNT]) -> f64 {
    theta[..FEATURE_COUNT]
        .iter()
        .zip(x)
        .map(|(w, v)| w * v)
        .sum::<f64>()
        + theta[FEATURE_COUNT]
}

fn objective(
    theta: &[f64; PARAMS],
    features: &[[f64; FEATURE_COUNT]],
    labels: &[u8],
    weights: &[f64],
    c: f64,
) -> f64 {
    let penalty: f64 = 0.5 * theta[..FEATURE_COUNT].iter().map(|w| w * w).sum::<f64>();
    let data: f64 = features
        .iter()
        .zip(labels)
        .zip(weights)
        .map(|((x, &y), s)| {
            let z = linear(theta, x);
            s * (softplus(z) - f64::from(y) * z)
        })
        .sum();
    penalty + c * data
}

fn derivatives(
    theta: &[f64; PARAMS],
    features: &[[f64; FEATURE_COUNT]],
    labels: &[u8],
    weights: &[f64],
    c: f64,
) -> ([f64; PARAMS], [[f64; PARAMS]; PARAMS]) {
    let mut gradient = [0.0; PARAMS];
    let mut hessian = [[0.0; PARAMS]; PARAMS];

    for ((x, &y), s) in features.iter().zip(labels).zip(weights) {
        let p = sigmoid(linear(theta, x));
        let row = augmented(x);
        let residual = c * s * (p - f64::from(y));
        let curvature = c * s * p * (1.0 - p);

        for i in 0..PARAMS {
            gradient[i] += residual * row[i];
            for j in 0..PARAMS {
                hessian[i][j] += curvature * row[i] * row[j];
            }
        }
    }

    for i in 0..FEATURE_COUNT {
        gradient[i] += theta[i];
        hessian[i][i] += 1.0;
    }

    (gradient, hessian)
}

fn augmented(x: &[f64; FEATURE_COUNT]) -> [f64; PARAMS] {
    let mut row = [1.0; PARAMS];
    row[..FEATURE_COUNT].copy_from_slice(x);
    row
}

fn apply_step(theta: &[f64; PARAMS], step: &[f64; PARAMS], scale: f64) -> [f64; PARAMS] {
    let mut next = *theta;
    for (t, s) in next.iter_mut().zip(step) {
        *t -= scale * s;
    }
    next
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting
fn solve(mut a: [[f64; PARAMS]; PARAMS], mut b: [f64; PARAMS]) -> Option<[f64; PARAMS]> {
    for col in 0..PARAMS {
        let pivot = (col..PARAMS).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-300 || !a[pivot][col].is_finite() {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..PARAMS {
            let factor = a[row][col] / a[col][col];
            for k in col..PARAMS {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; PARAMS];
    for row in (0..PARAMS).rev() {
        let tail: f64 = (row + 1..PARAMS).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
