//! gp-results: output collection and run storage.
//!
//! Provides:
//! - `OutputRow`: the per-evaluation parameter dictionary with
//!   discovery-ordered keys
//! - `OutputTable`: one row per design/off-design point, exported to CSV
//!   with a trailing `Comment` convergence column
//! - `RunManifest`: serialized run metadata alongside the table
//! - `MeasurementTable`: CSV input for adaptive-model tuning runs

pub mod error;
pub mod manifest;
pub mod measurements;
pub mod row;
pub mod table;

pub use error::{ResultsError, ResultsResult};
pub use manifest::RunManifest;
pub use measurements::MeasurementTable;
pub use row::{CellValue, OutputRow};
pub use table::OutputTable;
