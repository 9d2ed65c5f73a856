//! Score distribution histograms
//!
//! Per-class density histograms of calibrated scores over [-1, 1], so the
//! separation between stress and non-stress windows can be inspected without
//! a plotting stack.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower edge of the score range
const SCORE_MIN: f64 = -1.0;

/// Upper edge of the score range
const SCORE_MAX: f64 = 1.0;

/// One histogram bin with densities per class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub non_stress_density: f64,
    pub stress_density: f64,
}

/// Density histogram of test scores split by true label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistogram {
    pub bins: Vec<HistogramBin>,
    pub non_stress_count: usize,
    pub stress_count: usize,
}

impl ScoreHistogram {
    /// Build a histogram with `bin_count` equal-width bins over [-1, 1].
    ///
    /// Densities integrate to 1 per class (count / (total * width)); a class
    /// with no scores has zero density everywhere.
    pub fn new(scores: &[f64], labels: &[u8], bin_count: usize) -> Self {
        let bin_count = bin_count.max(1);
        let width = (SCORE_MAX - SCORE_MIN) / bin_count as f64;
        let mut counts = vec![[0usize; 2]; bin_count];
        let mut totals = [0usize; 2];

        for (&score, &label) in scores.iter().zip(labels) {
            if !score.is_finite() {
                continue;
            }
            let class = usize::from(label.min(1));
            let index = (((score - SCORE_MIN) / width).floor() as isize)
                .clamp(0, bin_count as isize - 1) as usize;
            counts[index][class] += 1;
            totals[class] += 1;
        }

        let density = |count: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / (total as f64 * width)
            }
        };

        let bins = counts
            .iter()
            .enumerate()
            .map(|(i, c)| HistogramBin {
                lower: SCORE_MIN + i as f64 * width,
                upper: SCORE_MIN + (i + 1) as f64 * width,
                non_stress_density: density(c[0], totals[0]),
                stress_density: density(c[1], totals[1]),
            })
            .collect();

        Self {
            bins,
            non_stress_count: totals[0],
            stress_count: totals[1],
        }
    }

    pub fn bin_width(&self) -> f64 {
        self.bins
            .first()
            .map(|b| b.upper - b.lower)
            .unwrap_or(SCORE_MAX - SCORE_MIN)
    }
}

/// Text rendering: one row per bin, `-` for non-stress and `#` for stress
impl fmt::Display for ScoreHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const BAR_WIDTH: f64 = 30.0;

        let peak = self
            .bins
            .iter()
            .map(|b| b.non_stress_density.max(b.stress_density))
            .fold(0.0, f64::max);

        writeln!(
            f,
            "Score distribution (non-stress n={}, stress n={})",
            self.non_stress_count, self.stress_count
        )?;
        for bin in &self.bins {
            let bar = |density: f64| {
                if peak > 0.0 {
                    (density / peak * BAR_WIDTH).round() as usize
                } else {
                    0
                }
            };
            writeln!(
                f,
                "[{:>6.3}, {:>6.3}) {:<30} {:<30}",
                bin.lower,
                bin.upper,
                "-".repeat(bar(bin.non_stress_density)),
                "#".repeat(bar(bin.stress_density))
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_densities_integrate_to_one() {
        let scores = [-0.9, -0.85, -0.2, 0.1, 0.6, 0.95, 1.0];
        let labels = [0, 0, 0, 1, 1, 1, 1];
        let histogram = ScoreHistogram::new(&scores, &labels, 40);

        assert_eq!(histogram.bins.len(), 40);
        assert_eq!(histogram.non_stress_count, 3);
        assert_eq!(histogram.stress_count, 4);

        let width = histogram.bin_width();
        let non_stress: f64 = histogram.bins.iter().map(|b| b.non_stress_density * width).sum();
        let stress: f64 = histogram.bins.iter().map(|b| b.stress_density * width).sum();
        assert!((non_stress - 1.0).abs() < 1e-9);
        assert!((stress - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_upper_edge_lands_in_last_bin() {
        let histogram = ScoreHistogram::new(&[1.0], &[1], 4);
        assert!(histogram.bins[3].stress_density > 0.0);
    }

    #[test]
    fn test_empty_class() {
        let histogram = ScoreHistogram::new(&[0.2], &[1], 10);
        assert!(histogram.bins.iter().all(|b| b.non_stress_density == 0.0));
        assert!(histogram.to_string().contains("non-stress n=0"));
    }
}
