//! Error types for the simulation driver.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A component failed during the design pass; fatal for the run.
    #[error("Design point failed in '{component}': {source}")]
    DesignPoint {
        component: String,
        #[source]
        source: gp_components::ComponentError,
    },

    /// A component failed during an off-design evaluation; the point is
    /// flagged and the sweep continues.
    #[error("Evaluation failed in '{component}': {source}")]
    Evaluation {
        component: String,
        #[source]
        source: gp_components::ComponentError,
    },

    #[error(transparent)]
    Solver(#[from] gp_solver::SolverError),

    #[error(transparent)]
    Results(#[from] gp_results::ResultsError),
}
