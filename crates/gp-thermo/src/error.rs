//! Error types for thermodynamic operations.

use thiserror::Error;

pub type ThermoResult<T> = Result<T, ThermoError>;

#[derive(Error, Debug)]
pub enum ThermoError {
    #[error("Non-physical state: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown species name: {name}")]
    UnknownSpecies { name: String },

    /// Inner T-from-H or T-from-S Newton failed within the iteration cap.
    #[error("EOS iteration did not converge: {what} (target {target})")]
    EosConvergence { what: &'static str, target: f64 },

    #[error("Equilibrium solve failed: {what}")]
    Equilibrium { what: String },
}
