//! Error types for component construction and evaluation.

use gp_core::ids::Station;
use thiserror::Error;

pub type ComponentResult<T> = Result<T, ComponentError>;

#[derive(Error, Debug)]
pub enum ComponentError {
    /// Invalid declarative model input; raised at construction time.
    #[error("Configuration error: {what}")]
    Config { what: String },

    #[error("No gas state at station {station}")]
    MissingStation { station: Station },

    #[error("Output parameter '{name}' not present in the output row")]
    MissingOutput { name: String },

    /// An inner 1-D root find (Wf for Texit, throat pressure, design PR)
    /// failed; the outer point is flagged as an exception.
    #[error("Inner root find failed: {what}")]
    InnerRoot { what: String },

    /// A state or error slot was used before the design-point pass
    /// registered it.
    #[error("State/error slot not registered: {what}")]
    SlotNotRegistered { what: &'static str },

    #[error(transparent)]
    Thermo(#[from] gp_thermo::ThermoError),

    #[error(transparent)]
    Map(#[from] gp_maps::MapError),

    #[error(transparent)]
    Results(#[from] gp_results::ResultsError),
}
