//! Matrix-free Newton outer loop with a GMRES inner solve.

use crate::error::{SolverError, SolverResult};
use crate::gmres::gmres;
use nalgebra::DVector;

/// Newton-Krylov configuration.
#[derive(Clone, Copy, Debug)]
pub struct NewtonKrylovConfig {
    /// Convergence threshold on the residual max-norm (residuals are
    /// normalized by their design values, so this is a relative test).
    pub tolerance: f64,
    /// Outer Newton iteration cap.
    pub max_iterations: usize,
    /// Finite-difference step for the Jacobian-vector products.
    pub jacobian_step: f64,
    /// Line search backtracking factor.
    pub line_search_beta: f64,
    /// Maximum line search trials per Newton step.
    pub max_line_search_iters: usize,
    /// Relative tolerance of the inner GMRES solve.
    pub gmres_tol: f64,
}

impl Default for NewtonKrylovConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iterations: 50,
            jacobian_step: 1e-3,
            line_search_beta: 0.5,
            max_line_search_iters: 8,
            gmres_tol: 1e-3,
        }
    }
}

/// Newton-Krylov result.
///
/// `converged == false` after the iteration cap is a flagged outcome, not
/// an error: `x` still carries the best state for warm-starting the next
/// operating point.
pub struct NewtonKrylovResult {
    /// Solution (or best-effort) state vector.
    pub x: DVector<f64>,
    /// Final residual max-norm.
    pub residual_norm: f64,
    /// Number of outer iterations used.
    pub iterations: usize,
    /// Whether the residual max-norm met the tolerance.
    pub converged: bool,
}

/// Drive `residual_fn` to zero from `x0`.
///
/// Each outer step solves J dx = -r with GMRES, where J*v is approximated
/// by forward differences of the residual function along v. A backtracking
/// line search on the residual max-norm guards the step; when no trial
/// improves the residual the full remaining step is taken anyway, which
/// matches the permissive behaviour engine matching needs far from the
/// operating line.
pub fn newton_krylov<F>(
    x0: DVector<f64>,
    mut residual_fn: F,
    config: &NewtonKrylovConfig,
) -> SolverResult<NewtonKrylovResult>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;
    let mut r_norm = r.amax();

    for iter in 0..config.max_iterations {
        if r_norm < config.tolerance {
            return Ok(NewtonKrylovResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
            });
        }

        // Inner linear solve, matrix-free: J v by forward differences
        // around the current residual.
        let dx = {
            let x_scale = x.amax().max(1.0);
            let rhs = -&r;
            let jv = |v: &DVector<f64>| -> SolverResult<DVector<f64>> {
                let v_norm = v.amax();
                if v_norm == 0.0 {
                    return Ok(DVector::zeros(r.len()));
                }
                let sigma = config.jacobian_step * x_scale / v_norm;
                let x_probe = &x + sigma * v;
                let r_probe = residual_fn(&x_probe)?;
                Ok((r_probe - &r) / sigma)
            };
            gmres(jv, &rhs, config.gmres_tol, rhs.len().max(1))?
        };

        // Backtracking line search on the residual max-norm.
        let mut alpha = 1.0;
        let mut accepted: Option<(DVector<f64>, DVector<f64>, f64)> = None;
        let mut fallback: Option<(DVector<f64>, DVector<f64>, f64)> = None;
        for _ in 0..config.max_line_search_iters {
            let x_trial = &x + alpha * &dx;
            match residual_fn(&x_trial) {
                Ok(r_trial) => {
                    let trial_norm = r_trial.amax();
                    if trial_norm < r_norm {
                        accepted = Some((x_trial, r_trial, trial_norm));
                        break;
                    }
                    if fallback.is_none() {
                        fallback = Some((x_trial, r_trial, trial_norm));
                    }
                }
                Err(_) => {
                    // Unevaluable trial state; shrink and retry.
                }
            }
            alpha *= config.line_search_beta;
        }

        let (x_new, r_new, r_new_norm) = match accepted.or(fallback) {
            Some(step) => step,
            None => {
                return Err(SolverError::LineSearchFailed { iteration: iter });
            }
        };

        tracing::debug!(
            iteration = iter,
            residual = r_new_norm,
            step = alpha,
            "newton-krylov step"
        );

        x = x_new;
        r = r_new;
        r_norm = r_new_norm;
    }

    let converged = r_norm < config.tolerance;
    Ok(NewtonKrylovResult {
        x,
        residual_norm: r_norm,
        iterations: config.max_iterations,
        converged,
    })
}
