//! Error types for solver operations.

use thiserror::Error;

/// Errors that can occur while driving the residual function.
///
/// Exceeding the outer iteration cap is deliberately NOT an error; it is
/// reported through [`crate::NewtonKrylovResult::converged`] so a sweep can
/// flag the point and continue.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The residual evaluator failed (an inner root find or EOS solve blew
    /// up); the caller flags the point as an exception.
    #[error("Residual evaluation failed: {what}")]
    Residual { what: String },

    #[error("Line search failed to find an evaluable step at iteration {iteration}")]
    LineSearchFailed { iteration: usize },

    #[error("Numeric failure: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
