//! Per-subject numerics adapter
//!
//! Numerics files are CSV exports with one row per second and headers that
//! often carry stray whitespace (` SpO2`). Only the requested column is read.

use super::{column_index, csv_reader, parse_reading};
use crate::error::StressError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Adapter reading one reading column from a numerics CSV
pub struct NumericsAdapter;

impl NumericsAdapter {
    /// Read `column` from the CSV at `path`, keeping missing readings as `None`
    pub fn read_path(path: &Path, column: &str) -> Result<Vec<Option<f64>>, StressError> {
        let file = File::open(path)?;
        Self::read(file, column, &path.display().to_string())
    }

    /// Read `column` from any CSV source
    pub fn read<R: Read>(
        reader: R,
        column: &str,
        source_name: &str,
    ) -> Result<Vec<Option<f64>>, StressError> {
        let mut csv = csv_reader(reader);
        let index = column_index(csv.headers()?, column, source_name)?;

        let mut series = Vec::new();
        for (row, record) in csv.records().enumerate() {
            let record = record?;
            let reading = match record.get(index) {
                Some(raw) => parse_reading(raw, column, row)?,
                None => None,
            };
            series.push(reading);
        }

        Ok(series)
    }

    /// Drop missing readings, preserving time order
    pub fn compact(series: &[Option<f64>]) -> Vec<f64> {
        series.iter().flatten().copied().collect()
    }
}
