//! Z-score normalization
//!
//! Statistics are fit on the training partition only and then applied to any
//! partition, so test data never leaks into the transform.
//! - Center is the arithmetic mean
//! - Scale is the population standard deviation (zero variance maps to 1)

use crate::error::StressError;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Fitted z-score transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreNormalizer {
    pub mean: f64,
    pub scale: f64,
}

impl ZScoreNormalizer {
    /// Fit mean and scale on the given values
    pub fn fit(values: &[f64]) -> Result<Self, StressError> {
        if values.is_empty() {
            return Err(StressError::CalibrationError(
                "cannot fit z-score on an empty partition".to_string(),
            ));
        }

        let mean = values.mean();
        let std = values.population_std_dev();
        let scale = if std.is_finite() && std > 0.0 { std } else { 1.0 };

        Ok(Self { mean, scale })
    }

    pub fn transform_one(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform_one(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform() {
        let normalizer = ZScoreNormalizer::fit(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((normalizer.mean - 2.5).abs() < 1e-12);
        // Population variance: (2.25 + 0.25 + 0.25 + 2.25) / 4
        assert!((normalizer.scale - 1.25f64.sqrt()).abs() < 1e-12);

        let z = normalizer.transform(&[1.0, 2.0, 3.0, 4.0]);
        let z_mean: f64 = z.iter().sum::<f64>() / 4.0;
        assert!(z_mean.abs() < 1e-12);
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let normalizer = ZScoreNormalizer::fit(&[10.0, 20.0]).unwrap();
        // Test values are mapped with the training mean and scale
        assert!((normalizer.transform_one(25.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_values() {
        let normalizer = ZScoreNormalizer::fit(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(normalizer.scale, 1.0);
        assert_eq!(normalizer.transform_one(5.0), 0.0);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(ZScoreNormalizer::fit(&[]).is_err());
    }
}
