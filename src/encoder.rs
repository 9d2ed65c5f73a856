//! Artifact encoding
//!
//! This module writes every persisted output: the fitted model and calibration
//! parameters as JSON (stamped with producer metadata), and score tables as
//! CSV. Parent directories are created as needed and existing files are
//! overwritten.

use crate::calibration::CalibrationParams;
use crate::config::ExtractorConfig;
use crate::error::StressError;
use crate::histogram::ScoreHistogram;
use crate::model::LogisticModel;
use crate::types::{FusedScore, ScoreRecord, ScoredWindow, FEATURE_NAMES};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Header of the fused score column
pub const FUSED_SCORE_HEADER: &str = "Fused Stress Score";

/// Header of the fused interpretation column
pub const INTERPRETATION_HEADER: &str = "Interpretation";

/// Who produced an artifact and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at_utc: String,
}

/// Persisted classifier with the windowing it was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub producer: Producer,
    pub feature_names: Vec<String>,
    pub extractor: ExtractorConfig,
    pub model: LogisticModel,
}

/// Persisted calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsArtifact {
    pub producer: Producer,
    #[serde(flatten)]
    pub params: CalibrationParams,
}

/// Encoder for model, parameter and score-table artifacts
pub struct ArtifactEncoder {
    instance_id: String,
}

impl Default for ArtifactEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
            computed_at_utc: Utc::now().to_rfc3339(),
        }
    }

    pub fn write_model(
        &self,
        path: &Path,
        model: &LogisticModel,
        extractor: &ExtractorConfig,
    ) -> Result<(), StressError> {
        let artifact = ModelArtifact {
            producer: self.producer(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            extractor: extractor.clone(),
            model: model.clone(),
        };
        write_json(path, &artifact)
    }

    pub fn write_params(&self, path: &Path, params: &CalibrationParams) -> Result<(), StressError> {
        let artifact = ParamsArtifact {
            producer: self.producer(),
            params: *params,
        };
        write_json(path, &artifact)
    }
}

/// Load a model artifact
pub fn read_model(path: &Path) -> Result<ModelArtifact, StressError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a calibration parameter artifact
pub fn read_params(path: &Path) -> Result<ParamsArtifact, StressError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write the test-partition score table
pub fn write_scores(path: &Path, records: &[ScoreRecord]) -> Result<(), StressError> {
    write_rows(path, records)
}

/// Write windows scored at inference time
pub fn write_scored_windows(path: &Path, windows: &[ScoredWindow]) -> Result<(), StressError> {
    write_rows(path, windows)
}

/// Write per-class histogram densities
pub fn write_histogram(path: &Path, histogram: &ScoreHistogram) -> Result<(), StressError> {
    write_rows(path, &histogram.bins)
}

/// Write the fused table; the key column leads when present
pub fn write_fused(
    path: &Path,
    fused: &[FusedScore],
    key_column: Option<&str>,
) -> Result<(), StressError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    match key_column {
        Some(key) => writer.write_record([key, FUSED_SCORE_HEADER, INTERPRETATION_HEADER])?,
        None => writer.write_record([FUSED_SCORE_HEADER, INTERPRETATION_HEADER])?,
    }

    for row in fused {
        let score = row.score.to_string();
        match key_column {
            Some(_) => writer.write_record([
                row.key.as_deref().unwrap_or(""),
                score.as_str(),
                row.interpretation.as_str(),
            ])?,
            None => writer.write_record([score.as_str(), row.interpretation.as_str()])?,
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StressError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StressError> {
    ensure_parent(path)?;
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), StressError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StressLevel;

    #[test]
    fn test_producer_metadata() {
        let encoder = ArtifactEncoder::with_instance_id("run-1".to_string());
        let producer = encoder.producer();
        assert_eq!(producer.name, PRODUCER_NAME);
        assert_eq!(producer.instance_id, "run-1");
        assert!(!producer.computed_at_utc.is_empty());
    }

    #[test]
    fn test_params_artifact_is_flat() {
        let artifact = ParamsArtifact {
            producer: ArtifactEncoder::new().producer(),
            params: CalibrationParams {
                alpha: -0.2,
                beta: 0.4,
                scale: 3.0,
                center: 0.5,
                z_mean: 31.0,
                z_scale: 0.8,
            },
        };
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value["alpha"], -0.2);
        assert_eq!(value["center"], 0.5);
        assert!(value["producer"]["instance_id"].is_string());
    }

    #[test]
    fn test_params_reload_bit_for_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let params = CalibrationParams {
            alpha: -0.47353549212336643,
            beta: 0.1 + 0.2,
            scale: 2.0 / 3.0,
            center: 0.5,
            z_mean: 31.333333333333336,
            z_scale: 1e-7 / 3.0,
        };

        ArtifactEncoder::new().write_params(&path, &params).unwrap();
        assert_eq!(read_params(&path).unwrap().params, params);
    }

    #[test]
    fn test_write_fused_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fused.csv");
        let fused = vec![FusedScore {
            key: None,
            score: 0.5,
            interpretation: StressLevel::High,
        }];

        write_fused(&path, &fused, None).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Fused Stress Score,Interpretation"));
        assert_eq!(lines.next(), Some("0.5,High Stress"));
    }

    #[test]
    fn test_write_scores_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        let records = [ScoreRecord {
            z_score: 0.1,
            logit: 0.6,
            tanh_score: 0.3,
            true_label: 1,
            predicted: 0,
        }];

        write_scores(&path, &records).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("z-score,logit,tanh_score,true_label,predicted\n"));
    }
}
