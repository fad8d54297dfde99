//! Run manifest written alongside the output table.

use crate::error::ResultsResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub engine_name: String,
    pub timestamp: String,
    /// Number of design-point rows (normally 1).
    pub dp_points: usize,
    /// Off-design points attempted / converged.
    pub od_points: usize,
    pub od_converged: usize,
    pub error_tolerance: f64,
}

impl RunManifest {
    pub fn new(
        engine_name: impl Into<String>,
        dp_points: usize,
        od_points: usize,
        od_converged: usize,
        error_tolerance: f64,
    ) -> Self {
        Self {
            engine_name: engine_name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            dp_points,
            od_points,
            od_converged,
            error_tolerance,
        }
    }

    pub fn save(&self, path: &Path) -> ResultsResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> ResultsResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let manifest = RunManifest::new("turbojet", 1, 31, 31, 1e-4);
        manifest.save(&path).unwrap();
        let back = RunManifest::load(&path).unwrap();
        assert_eq!(back.engine_name, "turbojet");
        assert_eq!(back.od_points, 31);
        assert_eq!(back.od_converged, 31);
    }
}
