//! Multi-modality score fusion
//!
//! Averages per-modality tanh scores element-wise and buckets the result:
//! - fused > high threshold (0.3) is High Stress
//! - fused < low threshold (-0.3) is Non-Stress
//! - anything else is Moderate Stress
//!
//! Columns are lined up according to the configured [`Alignment`]. Strict
//! alignment is the default and rejects tables of different lengths.

use crate::adapters::{ScoreTable, ScoreTableAdapter};
use crate::config::{Alignment, FusionConfig};
use crate::encoder;
use crate::error::StressError;
use crate::types::{FusedScore, StressLevel};
use std::collections::{HashMap, HashSet};

/// Bucket a fused score
pub fn interpret(score: f64, low_threshold: f64, high_threshold: f64) -> StressLevel {
    if score > high_threshold {
        StressLevel::High
    } else if score < low_threshold {
        StressLevel::NonStress
    } else {
        StressLevel::Moderate
    }
}

/// Fuser combining modality score tables
pub struct ScoreFuser {
    config: FusionConfig,
}

impl ScoreFuser {
    pub fn new(config: FusionConfig) -> Result<Self, StressError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Load every configured table; any failure is fatal
    pub fn load_tables(&self) -> Result<Vec<ScoreTable>, StressError> {
        let key_column = match &self.config.alignment {
            Alignment::ByKey(column) => Some(column.as_str()),
            _ => None,
        };

        self.config
            .modality_files
            .iter()
            .map(|path| {
                let table =
                    ScoreTableAdapter::read_path(path, &self.config.score_column, key_column)?;
                tracing::info!(
                    path = %path.display(),
                    rows = table.len(),
                    "loaded modality scores"
                );
                Ok(table)
            })
            .collect()
    }

    /// Align and average already-loaded tables
    pub fn fuse_tables(&self, tables: &[ScoreTable]) -> Result<Vec<FusedScore>, StressError> {
        if tables.is_empty() {
            return Err(StressError::NoModalities);
        }

        let (keys, columns) = match &self.config.alignment {
            Alignment::Strict => (None, align_strict(tables)?),
            Alignment::TruncateToFirst => (None, align_truncate(tables)?),
            Alignment::ByKey(column) => {
                let (keys, columns) = align_by_key(tables, column)?;
                (Some(keys), columns)
            }
        };

        let rows = columns.first().map(Vec::len).unwrap_or(0);
        let fused = (0..rows)
            .map(|row| {
                let score =
                    columns.iter().map(|column| column[row]).sum::<f64>() / columns.len() as f64;
                FusedScore {
                    key: keys.as_ref().map(|k: &Vec<String>| k[row].clone()),
                    score,
                    interpretation: interpret(
                        score,
                        self.config.low_threshold,
                        self.config.high_threshold,
                    ),
                }
            })
            .collect();

        Ok(fused)
    }

    /// Load, fuse and write the configured tables
    pub fn run(&self) -> Result<Vec<FusedScore>, StressError> {
        let tables = self.load_tables()?;
        let fused = self.fuse_tables(&tables)?;

        let key_column = match &self.config.alignment {
            Alignment::ByKey(column) => Some(column.as_str()),
            _ => None,
        };
        encoder::write_fused(&self.config.output, &fused, key_column)?;
        tracing::info!(
            rows = fused.len(),
            modalities = tables.len(),
            output = %self.config.output.display(),
            "fused scores saved"
        );

        Ok(fused)
    }
}

fn align_strict(tables: &[ScoreTable]) -> Result<Vec<Vec<f64>>, StressError> {
    let expected = tables[0].len();
    if let Some(table) = tables.iter().find(|t| t.len() != expected) {
        return Err(StressError::MisalignedScores(format!(
            "{} has {} rows but {} has {}",
            table.source.display(),
            table.len(),
            tables[0].source.display(),
            expected
        )));
    }
    Ok(tables.iter().map(|t| t.scores.clone()).collect())
}

/// Cut later columns to the first column's length; a shorter column is fatal
fn align_truncate(tables: &[ScoreTable]) -> Result<Vec<Vec<f64>>, StressError> {
    let expected = tables[0].len();
    let mut columns = Vec::with_capacity(tables.len());

    for table in tables {
        if table.len() < expected {
            return Err(StressError::MisalignedScores(format!(
                "{} has {} rows, fewer than the {} rows of {}",
                table.source.display(),
                table.len(),
                expected,
                tables[0].source.display()
            )));
        }
        if table.len() > expected {
            tracing::warn!(
                path = %table.source.display(),
                dropped = table.len() - expected,
                "truncating modality scores to the first table's length"
            );
        }
        columns.push(table.scores[..expected].to_vec());
    }

    Ok(columns)
}

/// Inner join on a key column, in the first table's row order
fn align_by_key(
    tables: &[ScoreTable],
    column: &str,
) -> Result<(Vec<String>, Vec<Vec<f64>>), StressError> {
    let mut lookups: Vec<HashMap<&str, f64>> = Vec::with_capacity(tables.len());
    for table in tables {
        let keys = table.keys.as_ref().ok_or_else(|| StressError::MissingColumn {
            column: column.to_string(),
            source_name: table.source.display().to_string(),
        })?;

        let mut lookup = HashMap::with_capacity(keys.len());
        for (key, &score) in keys.iter().zip(&table.scores) {
            if lookup.insert(key.as_str(), score).is_some() {
                return Err(StressError::MisalignedScores(format!(
                    "duplicate key '{key}' in {}",
                    table.source.display()
                )));
            }
        }
        lookups.push(lookup);
    }

    let first_keys = tables[0].keys.as_deref().unwrap_or_default();
    let shared: Vec<String> = first_keys
        .iter()
        .filter(|key| lookups.iter().all(|lookup| lookup.contains_key(key.as_str())))
        .cloned()
        .collect();

    let all_keys: HashSet<&str> = lookups.iter().flat_map(|l| l.keys().copied()).collect();
    let dropped = all_keys.len() - shared.len();
    if dropped > 0 {
        tracing::warn!(dropped, column, "keys missing from at least one modality were dropped");
    }
    if shared.is_empty() {
        return Err(StressError::MisalignedScores(format!(
            "no '{column}' values are shared by every modality"
        )));
    }

    let columns = lookups
        .iter()
        .map(|lookup| shared.iter().map(|key| lookup[key.as_str()]).collect())
        .collect();

    Ok((shared, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn table(name: &str, scores: &[f64]) -> ScoreTable {
        ScoreTable {
            source: PathBuf::from(name),
            keys: None,
            scores: scores.to_vec(),
        }
    }

    fn keyed(name: &str, rows: &[(&str, f64)]) -> ScoreTable {
        ScoreTable {
            source: PathBuf::from(name),
            keys: Some(rows.iter().map(|(k, _)| k.to_string()).collect()),
            scores: rows.iter().map(|(_, s)| *s).collect(),
        }
    }

    fn fuser(alignment: Alignment) -> ScoreFuser {
        ScoreFuser::new(FusionConfig {
            alignment,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_interpretation_thresholds() {
        assert_eq!(interpret(0.5, -0.3, 0.3), StressLevel::High);
        assert_eq!(interpret(-0.5, -0.3, 0.3), StressLevel::NonStress);
        assert_eq!(interpret(0.0, -0.3, 0.3), StressLevel::Moderate);
        // Boundaries are moderate
        assert_eq!(interpret(0.3, -0.3, 0.3), StressLevel::Moderate);
        assert_eq!(interpret(-0.3, -0.3, 0.3), StressLevel::Moderate);
    }

    #[test]
    fn test_identical_columns_fuse_to_same_value() {
        for (value, level) in [
            (0.5, StressLevel::High),
            (-0.5, StressLevel::NonStress),
            (0.0, StressLevel::Moderate),
        ] {
            let tables: Vec<ScoreTable> =
                (0..5).map(|i| table(&format!("m{i}"), &[value])).collect();
            let fused = fuser(Alignment::Strict).fuse_tables(&tables).unwrap();

            assert_eq!(fused.len(), 1);
            assert!((fused[0].score - value).abs() < 1e-12);
            assert_eq!(fused[0].interpretation, level);
        }
    }

    #[test]
    fn test_element_wise_mean() {
        let tables = vec![table("a", &[0.9, -0.6]), table("b", &[0.3, -0.2])];
        let fused = fuser(Alignment::Strict).fuse_tables(&tables).unwrap();

        assert!((fused[0].score - 0.6).abs() < 1e-12);
        assert!((fused[1].score + 0.4).abs() < 1e-12);
        assert_eq!(fused[0].interpretation, StressLevel::High);
        assert_eq!(fused[1].interpretation, StressLevel::NonStress);
        assert!(fused.iter().all(|f| f.key.is_none()));
    }

    #[test]
    fn test_strict_rejects_mismatched_lengths() {
        let tables = vec![table("a", &[0.1, 0.2]), table("b", &[0.1, 0.2, 0.3])];
        let result = fuser(Alignment::Strict).fuse_tables(&tables);
        assert!(matches!(result, Err(StressError::MisalignedScores(_))));
    }

    #[test]
    fn test_truncate_to_first() {
        let tables = vec![table("a", &[0.2, 0.4]), table("b", &[0.4, 0.0, 0.9, 0.9])];
        let fused = fuser(Alignment::TruncateToFirst).fuse_tables(&tables).unwrap();

        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - 0.3).abs() < 1e-12);
        assert!((fused[1].score - 0.2).abs() < 1e-12);

        // A later table shorter than the first cannot be stacked
        let tables = vec![table("a", &[0.2, 0.4]), table("b", &[0.4])];
        assert!(fuser(Alignment::TruncateToFirst).fuse_tables(&tables).is_err());
    }

    #[test]
    fn test_by_key_joins_out_of_order_rows() {
        let tables = vec![
            keyed("a", &[("w1", 0.8), ("w2", -0.8), ("w3", 0.0)]),
            keyed("b", &[("w3", 0.2), ("w1", 0.4)]),
        ];
        let fused = fuser(Alignment::ByKey("window".to_string()))
            .fuse_tables(&tables)
            .unwrap();

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].key.as_deref(), Some("w1"));
        assert!((fused[0].score - 0.6).abs() < 1e-12);
        assert_eq!(fused[1].key.as_deref(), Some("w3"));
        assert!((fused[1].score - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_by_key_rejects_duplicates_and_missing_keys() {
        let duplicate = vec![keyed("a", &[("w1", 0.1), ("w1", 0.2)])];
        assert!(fuser(Alignment::ByKey("window".to_string()))
            .fuse_tables(&duplicate)
            .is_err());

        let unkeyed = vec![keyed("a", &[("w1", 0.1)]), table("b", &[0.1])];
        assert!(matches!(
            fuser(Alignment::ByKey("window".to_string())).fuse_tables(&unkeyed),
            Err(StressError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_no_tables() {
        assert!(matches!(
            fuser(Alignment::Strict).fuse_tables(&[]),
            Err(StressError::NoModalities)
        ));
    }
}
