//! gp-solver: matrix-free Newton-Krylov for steady-state engine matching.
//!
//! The residual evaluator is the whole-engine forward walk; no Jacobian is
//! ever formed. Each outer Newton step solves its linear system with GMRES
//! using finite-difference Jacobian-vector products, followed by a
//! backtracking line search on the residual max-norm. Non-convergence
//! within the iteration cap is a flagged result, not an error: off-design
//! sweeps carry on to the next point with the state vector preserved.

pub mod error;
pub mod gmres;
pub mod jacobian;
pub mod newton_krylov;

pub use error::{SolverError, SolverResult};
pub use jacobian::finite_difference_jacobian;
pub use newton_krylov::{NewtonKrylovConfig, NewtonKrylovResult, newton_krylov};
