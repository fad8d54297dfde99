//! Run-to-run output table.

use crate::error::ResultsResult;
use crate::row::{CellValue, OutputRow};
use std::path::Path;

/// Accumulates one [`OutputRow`] per design or off-design point.
///
/// Column order is the discovery order of the first row that introduced
/// each key; later rows may add columns, which append at the end. The
/// trailing `Comment` column carries the convergence status of each point.
#[derive(Debug, Clone, Default)]
pub struct OutputTable {
    columns: Vec<String>,
    rows: Vec<OutputRow>,
}

impl OutputTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, row: OutputRow) {
        for key in row.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.to_string());
            }
        }
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column as numbers; rows without the key (or with a text cell) are
    /// skipped.
    pub fn column_values(&self, key: &str) -> Vec<f64> {
        self.rows.iter().filter_map(|row| row.num(key)).collect()
    }

    /// Export as CSV. The `Comment` column is forced last regardless of
    /// when it was discovered.
    pub fn write_csv(&self, path: &Path) -> ResultsResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut ordered: Vec<&String> = self.columns.iter().filter(|c| *c != "Comment").collect();
        let comment = "Comment".to_string();
        ordered.push(&comment);

        writer.write_record(ordered.iter().map(|c| c.as_str()))?;
        for row in &self.rows {
            let record: Vec<String> = ordered.iter().map(|c| row.cell(c).render()).collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
