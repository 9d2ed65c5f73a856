//! Tabular input adapters
//!
//! This module provides adapters that read CSV tables and map the columns the
//! pipelines need into typed series:
//! - Per-subject numerics files (SpO2 readings with gaps)
//! - Per-modality score tables (`tanh_score` plus an optional key)

mod numerics;
mod scores;

pub use numerics::NumericsAdapter;
pub use scores::{ScoreTable, ScoreTableAdapter};

use crate::error::StressError;

/// Locate a column by name among whitespace-trimmed headers
fn column_index(
    headers: &csv::StringRecord,
    column: &str,
    source_name: &str,
) -> Result<usize, StressError> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| StressError::MissingColumn {
            column: column.to_string(),
            source_name: source_name.to_string(),
        })
}

/// Parse a cell as an optional reading; blanks, NaN markers and infinities are missing
fn parse_reading(raw: &str, column: &str, row: usize) -> Result<Option<f64>, StressError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_missing_marker(trimmed) {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if !value.is_finite() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(StressError::ParseValue {
            column: column.to_string(),
            row,
            value: trimmed.to_string(),
        }),
    }
}

fn is_missing_marker(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "nan" | "na" | "n/a" | "null" | "none"
    )
}

fn csv_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reading() {
        assert_eq!(parse_reading(" 97 ", "SpO2", 0).unwrap(), Some(97.0));
        assert_eq!(parse_reading("", "SpO2", 0).unwrap(), None);
        assert_eq!(parse_reading("NaN", "SpO2", 0).unwrap(), None);
        assert_eq!(parse_reading("NA", "SpO2", 0).unwrap(), None);
        assert_eq!(parse_reading("inf", "SpO2", 0).unwrap(), None);
        assert_eq!(parse_reading("-inf", "SpO2", 0).unwrap(), None);
        assert!(matches!(
            parse_reading("abc", "SpO2", 3),
            Err(StressError::ParseValue { row: 3, .. })
        ));
    }
}
