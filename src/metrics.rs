//! Classification metrics
//!
//! Per-class precision, recall, F1 and support for binary predictions, plus
//! accuracy and macro/weighted averages. Rendered as a fixed-width text table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metrics for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Report over both classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Indexed by label
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build a report from true and predicted labels
    pub fn new(truth: &[u8], predicted: &[u8]) -> Self {
        let total = truth.len().min(predicted.len());
        let pairs = || truth.iter().zip(predicted.iter());

        let classes = [0u8, 1u8].map(|class| {
            let tp = pairs().filter(|(&t, &p)| t == class && p == class).count();
            let predicted_pos = pairs().filter(|(_, &p)| p == class).count();
            let support = pairs().filter(|(&t, _)| t == class).count();

            let precision = ratio(tp, predicted_pos);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        });

        let correct = pairs().filter(|(t, p)| t == p).count();
        let accuracy = ratio(correct, total);

        let macro_avg = ClassMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / 2.0,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / 2.0,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / 2.0,
            support: total,
        };

        let weighted_avg = ClassMetrics {
            precision: weighted_mean(&classes, total, |c| c.precision),
            recall: weighted_mean(&classes, total, |c| c.recall),
            f1: weighted_mean(&classes, total, |c| c.f1),
            support: total,
        };

        Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
        }
    }
}

/// Support-weighted mean of one metric
fn weighted_mean(
    classes: &[ClassMetrics; 2],
    total: usize,
    metric: impl Fn(&ClassMetrics) -> f64,
) -> f64 {
    if total == 0 {
        return 0.0;
    }
    classes
        .iter()
        .map(|c| metric(c) * c.support as f64)
        .sum::<f64>()
        / total as f64
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (label, metrics) in self.classes.iter().enumerate() {
            write_row(f, &label.to_string(), metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, metrics: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, metrics.precision, metrics.recall, metrics.f1, metrics.support
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_values() {
        let truth = [0, 0, 0, 0, 1, 1];
        let predicted = [0, 0, 0, 1, 1, 0];
        let report = ClassificationReport::new(&truth, &predicted);

        let non_stress = report.classes[0];
        assert!((non_stress.precision - 0.75).abs() < 1e-12);
        assert!((non_stress.recall - 0.75).abs() < 1e-12);
        assert_eq!(non_stress.support, 4);

        let stress = report.classes[1];
        assert!((stress.precision - 0.5).abs() < 1e-12);
        assert!((stress.recall - 0.5).abs() < 1e-12);
        assert!((stress.f1 - 0.5).abs() < 1e-12);

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert!((report.macro_avg.f1 - 0.625).abs() < 1e-12);
        // (0.75 * 4 + 0.5 * 2) / 6
        assert!((report.weighted_avg.recall - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_predictions_for_class() {
        let report = ClassificationReport::new(&[0, 1, 1], &[0, 0, 0]);
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
    }

    #[test]
    fn test_display_contains_rows() {
        let report = ClassificationReport::new(&[0, 1], &[0, 1]);
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("macro avg"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("1.00"));
    }
}
