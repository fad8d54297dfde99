//! gp-engine: the simulation driver.
//!
//! An [`Engine`] owns an ordered component list and a [`SimContext`]. The
//! design-point run walks the components once, letting them size
//! themselves and register states and residuals; off-design sweeps then
//! drive the residuals to zero point by point with the matrix-free
//! Newton-Krylov solver, carrying the state vector forward between points
//! as a warm start. Failed points are flagged in the output table and the
//! sweep continues.

pub mod engine;
pub mod error;

pub use engine::{Engine, EngineConfig, OdSummary};
pub use error::{EngineError, EngineResult};
