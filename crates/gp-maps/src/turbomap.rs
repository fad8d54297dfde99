//! Scaled turbomachinery maps.

use crate::error::{MapError, MapResult};
use crate::interp::Grid2;
use crate::parser::MapFileReader;
use std::path::Path;

/// Which family of keyword grids a file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// MASS FLOW, EFFICIENCY, PRESSURE RATIO and SURGE LINE grids.
    Compressor,
    /// MIN/MAX PRESSURE RATIO rows plus MASS FLOW and EFFICIENCY grids;
    /// the PR table is reconstructed from the per-speed limits.
    Turbine,
}

/// Design-point scale factors moving the generic map onto the machine.
#[derive(Debug, Clone, Copy)]
pub struct ScaleFactors {
    pub nc: f64,
    pub wc: f64,
    pub pr: f64,
    pub eta: f64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self {
            nc: 1.0,
            wc: 1.0,
            pr: 1.0,
            eta: 1.0,
        }
    }
}

/// Health / deterioration multipliers applied on every evaluation; the
/// adaptive-model control adjusts these to tune a map onto test data.
#[derive(Debug, Clone, Copy)]
pub struct MapModifiers {
    pub wc: f64,
    pub pr: f64,
    pub eta: f64,
}

impl Default for MapModifiers {
    fn default() -> Self {
        Self {
            wc: 1.0,
            pr: 1.0,
            eta: 1.0,
        }
    }
}

/// A scaled map evaluation.
#[derive(Debug, Clone, Copy)]
pub struct MapPoint {
    pub wc: f64,
    pub pr: f64,
    pub eta: f64,
}

/// Compressor surge line samples (Wc, PR).
#[derive(Debug, Clone)]
pub struct SurgeLine {
    pub wc: Vec<f64>,
    pub pr: Vec<f64>,
}

/// Reynolds-number correction record carried by the legacy files.
#[derive(Debug, Clone, Copy)]
pub struct ReynoldsCorrection {
    pub rni: [f64; 2],
    pub f_rni: [f64; 2],
}

/// An immutable loaded map plus its design-point scaling.
#[derive(Debug, Clone)]
pub struct TurboMap {
    pub kind: MapKind,
    pub map_type: String,
    pub title: String,
    pub reynolds: ReynoldsCorrection,

    pub nc_values: Vec<f64>,
    pub beta_values: Vec<f64>,
    pub surge: Option<SurgeLine>,

    /// Map coordinates of the declared design point.
    pub nc_map_des: f64,
    pub beta_map_des: f64,

    scale: ScaleFactors,

    wc_interp: Grid2,
    eta_interp: Grid2,
    pr_interp: Grid2,
}

impl TurboMap {
    /// Load a compressor map (MASS FLOW / EFFICIENCY / PRESSURE RATIO /
    /// SURGE LINE grids, in file order).
    pub fn load_compressor(path: &Path, nc_map_des: f64, beta_map_des: f64) -> MapResult<Self> {
        let mut reader = MapFileReader::open(path)?;
        let (map_type, title) = reader.read_header()?;
        let (rni, f_rni) = reader.read_reynolds()?;

        let wc = reader.read_cross_table("MASS FLOW")?;
        let eta = reader.read_cross_table("EFFICIENCY")?;
        let pr = reader.read_cross_table("PRESSURE RATIO")?;
        // The surge line reuses the cross-table layout: its "beta" row
        // carries the Wc samples and its single data row the PR values.
        let surge = reader.read_cross_table("SURGE LINE")?;
        let surge = SurgeLine {
            wc: surge.beta,
            pr: surge.values.into_iter().next().ok_or(MapError::BadGrid {
                what: "surge line has no data row",
            })?,
        };

        let wc_interp = Grid2::new(wc.nc.clone(), wc.beta.clone(), &wc.values)?;
        let eta_interp = Grid2::new(eta.nc.clone(), eta.beta.clone(), &eta.values)?;
        let pr_interp = Grid2::new(pr.nc.clone(), pr.beta.clone(), &pr.values)?;

        tracing::debug!(
            path = %path.display(),
            speeds = wc.nc.len(),
            betas = wc.beta.len(),
            "compressor map loaded"
        );

        Ok(Self {
            kind: MapKind::Compressor,
            map_type,
            title,
            reynolds: ReynoldsCorrection { rni, f_rni },
            nc_values: wc.nc,
            beta_values: wc.beta,
            surge: Some(surge),
            nc_map_des,
            beta_map_des,
            scale: ScaleFactors::default(),
            wc_interp,
            eta_interp,
            pr_interp,
        })
    }

    /// Load a turbine map (MIN/MAX PRESSURE RATIO rows, then MASS FLOW and
    /// EFFICIENCY grids). The PR table is not stored in the file:
    /// PR[i][j] = PRmin[i] + beta[j] * (PRmax[i] - PRmin[i]).
    pub fn load_turbine(path: &Path, nc_map_des: f64, beta_map_des: f64) -> MapResult<Self> {
        let mut reader = MapFileReader::open(path)?;
        let (map_type, title) = reader.read_header()?;
        let (rni, f_rni) = reader.read_reynolds()?;

        // PR limit tables are single-row cross tables whose "beta" line
        // holds the map's Nc values.
        let prmin_table = reader.read_cross_table("MIN PRESSURE RATIO")?;
        let prmax_table = reader.read_cross_table("MAX PRESSURE RATIO")?;
        let prmin = prmin_table.values.into_iter().next().ok_or(MapError::BadGrid {
            what: "MIN PRESSURE RATIO has no data row",
        })?;
        let prmax = prmax_table.values.into_iter().next().ok_or(MapError::BadGrid {
            what: "MAX PRESSURE RATIO has no data row",
        })?;

        let wc = reader.read_cross_table("MASS FLOW")?;
        let eta = reader.read_cross_table("EFFICIENCY")?;

        if prmin.len() != wc.nc.len() || prmax.len() != wc.nc.len() {
            return Err(MapError::BadGrid {
                what: "PR limit rows do not match the speed grid",
            });
        }

        let pr_values: Vec<Vec<f64>> = (0..wc.nc.len())
            .map(|i| {
                wc.beta
                    .iter()
                    .map(|&beta| prmin[i] + beta * (prmax[i] - prmin[i]))
                    .collect()
            })
            .collect();

        let wc_interp = Grid2::new(wc.nc.clone(), wc.beta.clone(), &wc.values)?;
        let eta_interp = Grid2::new(eta.nc.clone(), eta.beta.clone(), &eta.values)?;
        let pr_interp = Grid2::new(wc.nc.clone(), wc.beta.clone(), &pr_values)?;

        tracing::debug!(
            path = %path.display(),
            speeds = wc.nc.len(),
            betas = wc.beta.len(),
            "turbine map loaded"
        );

        Ok(Self {
            kind: MapKind::Turbine,
            map_type,
            title,
            reynolds: ReynoldsCorrection { rni, f_rni },
            nc_values: wc.nc,
            beta_values: wc.beta,
            surge: None,
            nc_map_des,
            beta_map_des,
            scale: ScaleFactors::default(),
            wc_interp,
            eta_interp,
            pr_interp,
        })
    }

    /// Raw (unscaled) map values at map coordinates.
    pub fn raw_at(&self, nc_map: f64, beta_map: f64) -> MapPoint {
        MapPoint {
            wc: self.wc_interp.eval(nc_map, beta_map),
            pr: self.pr_interp.eval(nc_map, beta_map),
            eta: self.eta_interp.eval(nc_map, beta_map),
        }
    }

    /// Compute the design-point scale factors so that the map, read at its
    /// declared design coordinates, reproduces the machine design point.
    /// PR scales around 1, the other quantities multiplicatively.
    pub fn set_scaling(
        &mut self,
        nc_des: f64,
        wc_des: f64,
        pr_des: f64,
        eta_des: f64,
    ) -> MapResult<ScaleFactors> {
        let raw = self.raw_at(self.nc_map_des, self.beta_map_des);
        if self.nc_map_des == 0.0 || raw.wc == 0.0 || raw.eta == 0.0 {
            return Err(MapError::DegenerateScaling {
                what: "map design point evaluates to zero",
            });
        }
        if (raw.pr - 1.0).abs() < 1e-12 {
            return Err(MapError::DegenerateScaling {
                what: "map design pressure ratio is unity",
            });
        }
        self.scale = ScaleFactors {
            nc: nc_des / self.nc_map_des,
            wc: wc_des / raw.wc,
            pr: (pr_des - 1.0) / (raw.pr - 1.0),
            eta: eta_des / raw.eta,
        };
        tracing::debug!(
            sf_nc = self.scale.nc,
            sf_wc = self.scale.wc,
            sf_pr = self.scale.pr,
            sf_eta = self.scale.eta,
            "map scaling set"
        );
        Ok(self.scale)
    }

    /// Adopt scale factors computed on another map of the same family.
    pub fn adopt_scaling(&mut self, scale: ScaleFactors) {
        self.scale = scale;
    }

    pub fn scale_factors(&self) -> ScaleFactors {
        self.scale
    }

    /// Scaled performance at a corrected speed and beta state (the state
    /// multiplies the design beta coordinate). Health modifiers multiply
    /// in on every evaluation.
    pub fn scaled_performance(&self, nc: f64, beta_state: f64, mods: &MapModifiers) -> MapPoint {
        let nc_map = nc / self.scale.nc;
        let beta_map = beta_state * self.beta_map_des;
        let raw = self.raw_at(nc_map, beta_map);
        MapPoint {
            wc: self.scale.wc * raw.wc * mods.wc,
            pr: self.scale.pr * (raw.pr - 1.0) * mods.pr + 1.0,
            eta: self.scale.eta * raw.eta * mods.eta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    const COMPRESSOR_MAP: &str = "\
Synthetic compressor map; Wc, Eta and PR vary smoothly with Nc and beta.
99 1 SYNTHETIC COMPRESSOR
REYNOLDS RNI=0.50 f_RNI=0.97 RNI=1.00 f_RNI=1.00
 MASS FLOW
 6.005 0.20 0.40 0.60 0.80
 0.60  10.4  10.8  11.2  11.6
 0.75  13.4  13.8  14.2  14.6
 0.90  16.4  16.8  17.2  17.6
 1.00  18.4  18.8  19.2
       19.6
 1.10  20.4  20.8  21.2  21.6
 EFFICIENCY
 6.005 0.20 0.40 0.60 0.80
 0.60  0.70  0.74  0.76  0.74
 0.75  0.74  0.78  0.80  0.78
 0.90  0.78  0.82  0.84  0.82
 1.00  0.80  0.84  0.86  0.84
 1.10  0.78  0.82  0.84  0.82
 PRESSURE RATIO
 6.005 0.20 0.40 0.60 0.80
 0.60  1.8   2.0   2.2   2.4
 0.75  2.6   2.8   3.0   3.2
 0.90  3.4   3.6   3.8   4.0
 1.00  4.0   4.2   4.4   4.6
 1.10  4.6   4.8   5.0   5.2
 SURGE LINE
 2.005 10.0 14.0 18.0 22.0
 1.0   2.6   3.6   4.8   5.8
";

    const TURBINE_MAP: &str = "\
Synthetic turbine map.
99 2 SYNTHETIC TURBINE
REYNOLDS RNI=0.50 f_RNI=0.97 RNI=1.00 f_RNI=1.00
 MIN PRESSURE RATIO
 2.005 0.60 0.80 1.00 1.20
 1.0   1.20  1.30  1.40  1.50
 MAX PRESSURE RATIO
 2.005 0.60 0.80 1.00 1.20
 1.0   3.20  3.60  4.00  4.40
 MASS FLOW
 5.005 0.20 0.40 0.60 0.80
 0.60  7.0   7.4   7.8   8.2
 0.80  7.6   8.0   8.4   8.8
 1.00  8.2   8.6   9.0   9.4
 1.20  8.8   9.2   9.6  10.0
 EFFICIENCY
 5.005 0.20 0.40 0.60 0.80
 0.60  0.82  0.84  0.85  0.84
 0.80  0.84  0.86  0.87  0.86
 1.00  0.86  0.88  0.89  0.88
 1.20  0.85  0.87  0.88  0.87
";

    fn map_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn compressor_map_loads_all_grids() {
        let file = map_file(COMPRESSOR_MAP);
        let map = TurboMap::load_compressor(file.path(), 1.0, 0.60).unwrap();
        assert_eq!(map.kind, MapKind::Compressor);
        assert_eq!(map.nc_values.len(), 5);
        assert_eq!(map.beta_values.len(), 4);
        let surge = map.surge.as_ref().unwrap();
        assert_eq!(surge.wc, vec![10.0, 14.0, 18.0, 22.0]);
        assert_eq!(surge.pr.len(), 4);
        // Wrapped row parsed correctly.
        assert_relative_eq!(map.raw_at(1.0, 0.80).wc, 19.6, epsilon = 1e-9);
    }

    #[test]
    fn turbine_pr_table_is_reconstructed_from_limits() {
        let file = map_file(TURBINE_MAP);
        let map = TurboMap::load_turbine(file.path(), 1.0, 0.60).unwrap();
        // PR(nc=0.80 row index 1, beta=0.40) = 1.30 + 0.40*(3.60-1.30)
        let expected = 1.30 + 0.40 * (3.60 - 1.30);
        assert_relative_eq!(map.raw_at(0.80, 0.40).pr, expected, epsilon = 1e-9);
    }

    #[test]
    fn design_point_scaling_reproduces_design_values() {
        let file = map_file(COMPRESSOR_MAP);
        let mut map = TurboMap::load_compressor(file.path(), 1.0, 0.60).unwrap();
        map.set_scaling(16_540.0, 19.0, 6.92, 0.825).unwrap();

        // Property: at Nc = Nc_des and beta_state = 1 the scaled map gives
        // back exactly the declared design quantities.
        let point = map.scaled_performance(16_540.0, 1.0, &MapModifiers::default());
        assert_relative_eq!(point.wc, 19.0, max_relative = 1e-9);
        assert_relative_eq!(point.pr, 6.92, max_relative = 1e-9);
        assert_relative_eq!(point.eta, 0.825, max_relative = 1e-9);
    }

    #[test]
    fn health_modifiers_multiply_in() {
        let file = map_file(COMPRESSOR_MAP);
        let mut map = TurboMap::load_compressor(file.path(), 1.0, 0.60).unwrap();
        map.set_scaling(16_540.0, 19.0, 6.92, 0.825).unwrap();
        let mods = MapModifiers {
            wc: 0.97,
            pr: 1.0,
            eta: 0.95,
        };
        let clean = map.scaled_performance(16_540.0, 1.0, &MapModifiers::default());
        let worn = map.scaled_performance(16_540.0, 1.0, &mods);
        assert_relative_eq!(worn.wc, clean.wc * 0.97, max_relative = 1e-12);
        assert_relative_eq!(worn.eta, clean.eta * 0.95, max_relative = 1e-12);
        assert_relative_eq!(worn.pr, clean.pr, max_relative = 1e-12);
    }

    #[test]
    fn pr_scales_around_unity() {
        let file = map_file(COMPRESSOR_MAP);
        let mut map = TurboMap::load_compressor(file.path(), 1.0, 0.60).unwrap();
        map.set_scaling(16_540.0, 19.0, 6.92, 0.825).unwrap();
        let mods = MapModifiers {
            wc: 1.0,
            pr: 0.5,
            eta: 1.0,
        };
        let point = map.scaled_performance(16_540.0, 1.0, &mods);
        assert_relative_eq!(point.pr, 0.5 * (6.92 - 1.0) + 1.0, max_relative = 1e-9);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = TurboMap::load_compressor(Path::new("/no/such/map.map"), 1.0, 0.5);
        assert!(matches!(err, Err(MapError::Io { .. })));
    }

    #[test]
    fn scaled_map_extrapolates_beyond_the_grid() {
        let file = map_file(COMPRESSOR_MAP);
        let mut map = TurboMap::load_compressor(file.path(), 1.0, 0.60).unwrap();
        map.set_scaling(16_540.0, 19.0, 6.92, 0.825).unwrap();
        // Beta state beyond the sampled range still evaluates (no cap).
        let point = map.scaled_performance(16_540.0, 1.5, &MapModifiers::default());
        assert!(point.wc.is_finite() && point.pr.is_finite() && point.eta.is_finite());
        assert!(point.wc > 19.0);
    }
}
