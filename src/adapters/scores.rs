//! Modality score table adapter

use super::{column_index, csv_reader, parse_reading};
use crate::error::StressError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Scores loaded from one modality table
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    /// Where the table was read from
    pub source: PathBuf,
    /// Values of the key column, when one was requested
    pub keys: Option<Vec<String>>,
    pub scores: Vec<f64>,
}

impl ScoreTable {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Adapter reading score (and key) columns from a modality table
pub struct ScoreTableAdapter;

impl ScoreTableAdapter {
    pub fn read_path(
        path: &Path,
        score_column: &str,
        key_column: Option<&str>,
    ) -> Result<ScoreTable, StressError> {
        let file = File::open(path)?;
        let mut table = Self::read(file, score_column, key_column, &path.display().to_string())?;
        table.source = path.to_path_buf();
        Ok(table)
    }

    /// Read a score table; every row must carry a score
    pub fn read<R: Read>(
        reader: R,
        score_column: &str,
        key_column: Option<&str>,
        source_name: &str,
    ) -> Result<ScoreTable, StressError> {
        let mut csv = csv_reader(reader);
        let headers = csv.headers()?.clone();
        let score_index = column_index(&headers, score_column, source_name)?;
        let key_index = key_column
            .map(|column| column_index(&headers, column, source_name))
            .transpose()?;

        let mut scores = Vec::new();
        let mut keys = key_index.map(|_| Vec::new());

        for (row, record) in csv.records().enumerate() {
            let record = record?;
            let raw = record.get(score_index).unwrap_or("");
            let score = parse_reading(raw, score_column, row)?.ok_or_else(|| {
                StressError::ParseValue {
                    column: score_column.to_string(),
                    row,
                    value: raw.to_string(),
                }
            })?;

            if !(-1.0..=1.0).contains(&score) {
                tracing::warn!(
                    source = source_name,
                    row,
                    score,
                    "score outside [-1, 1]"
                );
            }
            scores.push(score);

            if let (Some(index), Some(keys)) = (key_index, keys.as_mut()) {
                keys.push(record.get(index).unwrap_or("").trim().to_string());
            }
        }

        Ok(ScoreTable {
            source: PathBuf::from(source_name),
            keys,
            scores,
        })
    }
}
