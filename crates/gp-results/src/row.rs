//! Per-evaluation output dictionary.

use std::collections::HashMap;

/// A single output cell: numeric, text (mode and comment columns) or empty
/// (a column another row introduced).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Num(f64),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn as_num(&self) -> Option<f64> {
        match self {
            CellValue::Num(v) => Some(*v),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            CellValue::Num(v) => format!("{v:.6}"),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

/// Parameter dictionary filled during one forward walk of the engine.
///
/// Keys keep their discovery order, which fixes the column order of the
/// output table; closed-loop controls read current values back out of the
/// row during the same evaluation.
#[derive(Debug, Clone, Default)]
pub struct OutputRow {
    keys: Vec<String>,
    cells: HashMap<String, CellValue>,
}

impl OutputRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.insert(key, CellValue::Num(value));
    }

    pub fn set_text(&mut self, key: &str, value: impl Into<String>) {
        self.insert(key, CellValue::Text(value.into()));
    }

    fn insert(&mut self, key: &str, value: CellValue) {
        if !self.cells.contains_key(key) {
            self.keys.push(key.to_string());
        }
        self.cells.insert(key.to_string(), value);
    }

    pub fn num(&self, key: &str) -> Option<f64> {
        self.cells.get(key).and_then(CellValue::as_num)
    }

    pub fn cell(&self, key: &str) -> CellValue {
        self.cells.get(key).cloned().unwrap_or(CellValue::Empty)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cells.contains_key(key)
    }

    /// Keys in discovery order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
