use crate::CoreError;

/// Floating point type used throughout the workspace.
pub type Real = f64;

/// One tolerance pair for everything.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Options for [`solve_scalar`].
#[derive(Clone, Copy, Debug)]
pub struct ScalarSolveOptions {
    /// Convergence threshold on |f(x)|.
    pub f_tol: Real,
    /// Convergence threshold on the step size, relative to max(1, |x|).
    pub x_tol: Real,
    /// Relative size of the probe step used to start the secant iteration.
    pub first_step: Real,
    /// Iteration cap.
    pub max_iterations: usize,
}

impl Default for ScalarSolveOptions {
    fn default() -> Self {
        Self {
            f_tol: 1e-9,
            x_tol: 1e-10,
            first_step: 1e-4,
            max_iterations: 80,
        }
    }
}

/// Failure modes of [`solve_scalar`].
#[derive(Debug)]
pub enum ScalarSolveError<E> {
    /// The residual closure itself failed.
    Residual(E),
    /// The iteration cap was reached without meeting either tolerance.
    NoConvergence {
        iterations: usize,
        last_x: Real,
        last_f: Real,
    },
}

/// Scalar root finder shared by the EOS temperature solves, the combustor
/// Wf-for-Texit iteration, the nozzle choked-throat pressure solve and the
/// turbine design-point pressure-ratio solve.
///
/// Secant iteration from `x0`, upgraded to bisection whenever a sign-change
/// bracket has been observed and the secant step would leave it. The
/// residual is a fallible closure so callers propagate their own errors.
pub fn solve_scalar<E, F>(
    mut f: F,
    x0: Real,
    opts: &ScalarSolveOptions,
) -> Result<Real, ScalarSolveError<E>>
where
    F: FnMut(Real) -> Result<Real, E>,
{
    let mut x_prev = x0;
    let mut f_prev = f(x_prev).map_err(ScalarSolveError::Residual)?;
    if f_prev.abs() <= opts.f_tol {
        return Ok(x_prev);
    }

    let mut x = x0 + opts.first_step * x0.abs().max(1.0);
    let mut f_cur = f(x).map_err(ScalarSolveError::Residual)?;

    // Bracket endpoints once a sign change is seen.
    let mut bracket: Option<(Real, Real, Real, Real)> = None;
    let note_bracket = |xa: Real, fa: Real, xb: Real, fb: Real| {
        if fa * fb < 0.0 {
            let (lo, hi) = if xa < xb { (xa, xb) } else { (xb, xa) };
            let (flo, fhi) = if xa < xb { (fa, fb) } else { (fb, fa) };
            Some((lo, hi, flo, fhi))
        } else {
            None
        }
    };
    if let Some(b) = note_bracket(x_prev, f_prev, x, f_cur) {
        bracket = Some(b);
    }

    for iter in 0..opts.max_iterations {
        if f_cur.abs() <= opts.f_tol {
            return Ok(x);
        }

        let denom = f_cur - f_prev;
        let mut x_next = if denom.abs() > Real::EPSILON * f_cur.abs().max(1.0) {
            x - f_cur * (x - x_prev) / denom
        } else {
            // Flat residual: nudge and keep going.
            x + opts.first_step * x.abs().max(1.0)
        };

        if let Some((lo, hi, _flo, _fhi)) = bracket {
            if !(lo..=hi).contains(&x_next) || !x_next.is_finite() {
                x_next = 0.5 * (lo + hi);
            }
        } else if !x_next.is_finite() {
            return Err(ScalarSolveError::NoConvergence {
                iterations: iter,
                last_x: x,
                last_f: f_cur,
            });
        }

        let f_next = f(x_next).map_err(ScalarSolveError::Residual)?;

        if let Some((lo, hi, flo, fhi)) = bracket {
            // Shrink the bracket around the sign change.
            bracket = if flo * f_next <= 0.0 {
                Some((lo, x_next, flo, f_next))
            } else {
                Some((x_next, hi, f_next, fhi))
            };
        } else if let Some(b) = note_bracket(x, f_cur, x_next, f_next) {
            bracket = Some(b);
        }

        let step = (x_next - x).abs();
        x_prev = x;
        f_prev = f_cur;
        x = x_next;
        f_cur = f_next;

        if step <= opts.x_tol * x.abs().max(1.0) && f_cur.abs() <= opts.f_tol.max(1e-6) {
            return Ok(x);
        }
    }

    if f_cur.abs() <= opts.f_tol.max(1e-6) {
        return Ok(x);
    }
    Err(ScalarSolveError::NoConvergence {
        iterations: opts.max_iterations,
        last_x: x,
        last_f: f_cur,
    })
}
