//! Finite difference Jacobian computation.

use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};

/// Compute a dense Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by a step scaled to the coordinate and
/// computes (f(x+e) - f(x))/e. The matrix-free path never calls this; it
/// exists for small verification problems and solver tests.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    mut f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let mut x_perturbed = x.clone();
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] += dx;

        let f_perturbed = f(&x_perturbed)?;
        let df = (f_perturbed - &f_x) / dx;

        for i in 0..m {
            jac[(i, j)] = df[i];
        }
    }

    Ok(jac)
}
