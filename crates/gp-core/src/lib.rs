//! gp-core: stable foundation for the gaspath workspace.
//!
//! Contains:
//! - units (uom SI types + constructors, standard-day constants)
//! - numeric (Real + tolerances + the shared scalar root finder)
//! - ids (stable compact IDs + station numbers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
