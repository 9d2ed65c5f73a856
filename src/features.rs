//! Feature extraction
//!
//! This module slides a fixed window over a series of readings and derives,
//! per window:
//! - Mean reading
//! - Sample standard deviation
//! - Fraction of readings below the threshold
//!
//! Each window is labeled stress when its mean is strictly below the threshold.

use crate::config::ExtractorConfig;
use crate::types::{LabeledWindow, WindowFeatures, NON_STRESS, STRESS};
use statrs::statistics::Statistics;

/// Feature extractor for windowed readings
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Extract labeled windows from a series with possible missing readings.
    ///
    /// Windows containing any missing reading are skipped entirely, as are
    /// windows whose features are not finite. A series too short for one
    /// window, or a window below 2 samples, yields an empty result.
    pub fn extract(series: &[Option<f64>], config: &ExtractorConfig) -> Vec<LabeledWindow> {
        window_starts(series.len(), config)
            .filter_map(|start| {
                let slice = &series[start..start + config.window];
                let readings: Option<Vec<f64>> = slice.iter().copied().collect();
                readings.map(|readings| label_window(start, &readings, config.threshold))
            })
            .filter(|window| window.features.is_finite())
            .collect()
    }

    /// Extract labeled windows from a series with no missing readings
    pub fn extract_complete(series: &[f64], config: &ExtractorConfig) -> Vec<LabeledWindow> {
        window_starts(series.len(), config)
            .map(|start| {
                let readings = &series[start..start + config.window];
                label_window(start, readings, config.threshold)
            })
            .filter(|window| window.features.is_finite())
            .collect()
    }
}

/// Start indices of every candidate window.
///
/// By default a start is valid while `start + window < len`, so the window
/// ending exactly on the last sample is not produced. `include_final_window`
/// relaxes this to `start + window <= len`. Windows shorter than 2 samples
/// have no sample standard deviation and produce no starts.
pub fn window_starts(len: usize, config: &ExtractorConfig) -> impl Iterator<Item = usize> {
    let window = config.window;
    let last_exclusive = if window < 2 {
        0
    } else if config.include_final_window {
        (len + 1).saturating_sub(window)
    } else {
        len.saturating_sub(window)
    };
    (0..last_exclusive).step_by(config.stride.max(1))
}

fn label_window(start: usize, readings: &[f64], threshold: f64) -> LabeledWindow {
    let features = window_features(readings, threshold);
    let label = if features.mean < threshold {
        STRESS
    } else {
        NON_STRESS
    };

    LabeledWindow {
        start,
        features,
        label,
    }
}

/// Compute mean, sample standard deviation and below-threshold fraction
pub fn window_features(readings: &[f64], threshold: f64) -> WindowFeatures {
    let below = readings.iter().filter(|&&v| v < threshold).count();

    WindowFeatures {
        mean: readings.mean(),
        std: readings.std_dev(),
        below_fraction: below as f64 / readings.len() as f64,
    }
}
