//! GMRES with modified Gram-Schmidt Arnoldi and Givens rotations.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};

/// Solve A x = b where A is only available as a matvec closure.
///
/// Single Krylov cycle with the subspace capped at `max_dim`; the engine
/// matching systems are small (a handful of states), so the subspace
/// normally reaches the full dimension and the solve is exact to the
/// requested tolerance.
pub fn gmres<F>(
    mut matvec: F,
    b: &DVector<f64>,
    rel_tol: f64,
    max_dim: usize,
) -> SolverResult<DVector<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = b.len();
    let beta = b.norm();
    if beta == 0.0 {
        return Ok(DVector::zeros(n));
    }
    let m = max_dim.min(n).max(1);

    // Arnoldi basis and the Hessenberg factor, grown column by column.
    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(m + 1);
    basis.push(b / beta);
    let mut h = DMatrix::zeros(m + 1, m);

    // Givens rotation pairs and the rotated right-hand side.
    let mut cs = vec![0.0_f64; m];
    let mut sn = vec![0.0_f64; m];
    let mut g = DVector::zeros(m + 1);
    g[0] = beta;

    let mut dims = 0;
    for j in 0..m {
        let mut w = matvec(&basis[j])?;
        for i in 0..=j {
            let hij = w.dot(&basis[i]);
            h[(i, j)] = hij;
            w -= hij * &basis[i];
        }
        let h_next = w.norm();
        h[(j + 1, j)] = h_next;

        // Apply the accumulated rotations to the new column.
        for i in 0..j {
            let temp = cs[i] * h[(i, j)] + sn[i] * h[(i + 1, j)];
            h[(i + 1, j)] = -sn[i] * h[(i, j)] + cs[i] * h[(i + 1, j)];
            h[(i, j)] = temp;
        }
        let denom = (h[(j, j)] * h[(j, j)] + h_next * h_next).sqrt();
        if denom == 0.0 {
            return Err(SolverError::Numeric {
                what: "GMRES Hessenberg column vanished".to_string(),
            });
        }
        cs[j] = h[(j, j)] / denom;
        sn[j] = h_next / denom;
        h[(j, j)] = denom;
        h[(j + 1, j)] = 0.0;

        g[j + 1] = -sn[j] * g[j];
        g[j] *= cs[j];

        dims = j + 1;
        let residual = g[j + 1].abs();
        if residual <= rel_tol * beta || h_next <= 1e-14 * beta {
            break;
        }
        if j + 1 < m {
            basis.push(w / h_next);
        }
    }

    // Back-substitute the triangular system H y = g.
    let mut y = DVector::zeros(dims);
    for i in (0..dims).rev() {
        let mut sum = g[i];
        for j2 in i + 1..dims {
            sum -= h[(i, j2)] * y[j2];
        }
        if h[(i, i)].abs() < 1e-300 {
            return Err(SolverError::Numeric {
                what: "GMRES triangular factor is singular".to_string(),
            });
        }
        y[i] = sum / h[(i, i)];
    }

    let mut x = DVector::zeros(n);
    for (i, v) in basis.iter().take(dims).enumerate() {
        x += y[i] * v;
    }
    Ok(x)
}
