//! gp-thermo: real-gas mixture thermodynamics for the gaspath workspace.
//!
//! Provides:
//! - The fixed combustion species set (air species, products, two fuels)
//! - NASA 7-coefficient property polynomials
//! - Mass-fraction compositions with normalization invariants
//! - `GasState`: a flowing gas mixture with (T,P,Y)/(H,P)/(S,P) assignment
//!   and chemical equilibration at fixed (T,P) or (H,P)
//! - Process utilities: compression/expansion with isentropic or polytropic
//!   efficiency, isentropic exit velocity, expansion through a fixed throat
//!   area with the choked branch, stagnation pressure recovery
//!
//! The mixture model is thermally perfect: NASA polynomial caloric data
//! with the ideal-gas equation of state, which is the level of the
//! GRI-style mechanisms this engine family is calibrated against.

pub mod composition;
pub mod equilibrium;
pub mod error;
pub mod nasa7;
pub mod process;
pub mod species;
pub mod state;

pub use composition::{Composition, SPECIES_COUNT};
pub use error::{ThermoError, ThermoResult};
pub use process::{
    AreaExpansion, compression, exit_velocity, expansion_to_area, stagnation_pressure,
    turbine_expansion,
};
pub use species::{Element, Species};
pub use state::GasState;
