//! gp-maps: turbomachinery map handling.
//!
//! Loads the legacy fixed-format map files (magic `99` header line,
//! REYNOLDS correction record, keyword grids with packed row/column
//! counts and free line wrapping), builds bicubic interpolants over the
//! (Nc, beta) grid, computes design-point scaling factors and evaluates
//! scaled performance with health modifiers during iteration.

pub mod error;
pub mod interp;
pub mod parser;
pub mod turbomap;

pub use error::{MapError, MapResult};
pub use interp::{CubicSpline, Grid2};
pub use turbomap::{
    MapKind, MapModifiers, MapPoint, ReynoldsCorrection, ScaleFactors, SurgeLine, TurboMap,
};
