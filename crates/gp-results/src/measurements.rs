//! Measured operating-point input for adaptive-model tuning.

use crate::error::{ResultsError, ResultsResult};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// A CSV of measured operating points, one row per point, indexed by the
/// mandatory `Point` column. All other columns are numeric parameters
/// (measured values, fuel flow, ambient overrides).
#[derive(Debug, Clone)]
pub struct MeasurementTable {
    columns: Vec<String>,
    rows: HashMap<usize, HashMap<String, f64>>,
    points: Vec<usize>,
}

impl MeasurementTable {
    pub fn from_path(path: &Path) -> ResultsResult<Self> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv_reader(reader)
    }

    pub fn from_csv_str(text: &str) -> ResultsResult<Self> {
        let reader = csv::Reader::from_reader(text.as_bytes());
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> ResultsResult<Self> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let point_idx = headers.iter().position(|h| h == "Point").ok_or_else(|| {
            ResultsError::Measurement {
                what: "missing mandatory 'Point' column".to_string(),
            }
        })?;

        let mut rows = HashMap::new();
        let mut points = Vec::new();
        for record in reader.records() {
            let record = record?;
            let point: usize = record
                .get(point_idx)
                .unwrap_or("")
                .trim()
                .parse()
                .map_err(|_| ResultsError::Measurement {
                    what: "non-integer 'Point' value".to_string(),
                })?;
            let mut row = HashMap::new();
            for (i, header) in headers.iter().enumerate() {
                if i == point_idx {
                    continue;
                }
                let raw = record.get(i).unwrap_or("").trim();
                if raw.is_empty() {
                    continue;
                }
                let value: f64 = raw.parse().map_err(|_| ResultsError::Measurement {
                    what: format!("non-numeric value '{raw}' in column '{header}'"),
                })?;
                row.insert(header.clone(), value);
            }
            points.push(point);
            rows.insert(point, row);
        }

        Ok(Self {
            columns: headers,
            rows,
            points,
        })
    }

    /// Points in file order; these become the OD sweep indices.
    pub fn points(&self) -> &[usize] {
        &self.points
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn value(&self, point: usize, column: &str) -> ResultsResult<f64> {
        self.rows
            .get(&point)
            .and_then(|row| row.get(column))
            .copied()
            .ok_or_else(|| ResultsError::Measurement {
                what: format!("no value for point {point}, column '{column}'"),
            })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Point,Wf,N1%,T3,P3,T5
0,0.380,100.0,548.0,698000,948.0
1,0.330,95.5,531.0,642000,921.0
2,0.285,90.2,512.0,581000,890.0
";

    #[test]
    fn parses_points_in_order() {
        let table = MeasurementTable::from_csv_str(CSV).unwrap();
        assert_eq!(table.points(), &[0, 1, 2]);
        assert_eq!(table.value(1, "Wf").unwrap(), 0.330);
        assert_eq!(table.value(2, "T5").unwrap(), 890.0);
        assert!(table.has_column("N1%"));
    }

    #[test]
    fn missing_point_column_is_an_error() {
        let bad = "Wf,T3\n0.3,540\n";
        assert!(MeasurementTable::from_csv_str(bad).is_err());
    }

    #[test]
    fn missing_value_is_an_error() {
        let table = MeasurementTable::from_csv_str(CSV).unwrap();
        assert!(table.value(0, "EGT").is_err());
        assert!(table.value(9, "Wf").is_err());
    }
}
