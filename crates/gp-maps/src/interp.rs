//! Cubic spline interpolation on regular grids.
//!
//! Natural cubic splines per axis, composed into a tensor-product
//! evaluator for the (Nc, beta) tables. Queries outside the grid are
//! evaluated with the end-segment polynomial, so extrapolation uses the
//! same formula as interpolation (no cap) — the solver is allowed to
//! wander off the map and pay for it in its own residuals.

use crate::error::{MapError, MapResult};

/// One-dimensional natural cubic spline.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots (zero for n < 3).
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> MapResult<Self> {
        if x.len() != y.len() || x.is_empty() {
            return Err(MapError::BadGrid {
                what: "spline needs equally sized, non-empty x and y",
            });
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MapError::BadGrid {
                what: "spline abscissae must be strictly increasing",
            });
        }
        let n = x.len();
        let mut m = vec![0.0; n];
        if n >= 3 {
            // Thomas algorithm on the natural-spline tridiagonal system.
            let mut sub = vec![0.0; n];
            let mut diag = vec![0.0; n];
            let mut sup = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                let h0 = x[i] - x[i - 1];
                let h1 = x[i + 1] - x[i];
                sub[i] = h0;
                diag[i] = 2.0 * (h0 + h1);
                sup[i] = h1;
                rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
            }
            // Natural ends: m[0] = m[n-1] = 0; solve interior.
            for i in 2..n - 1 {
                let w = sub[i] / diag[i - 1];
                diag[i] -= w * sup[i - 1];
                rhs[i] -= w * rhs[i - 1];
            }
            for i in (1..n - 1).rev() {
                let upper = if i + 1 < n - 1 { sup[i] * m[i + 1] } else { 0.0 };
                m[i] = (rhs[i] - upper) / diag[i];
            }
        }
        Ok(Self { x, y, m })
    }

    /// Evaluate at `x`, extrapolating with the nearest segment.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.x.len();
        if n == 1 {
            return self.y[0];
        }
        // Segment index, clamped so the end polynomials extrapolate.
        let i = match self.x.binary_search_by(|v| v.partial_cmp(&x).unwrap()) {
            Ok(i) => i.min(n - 2),
            Err(0) => 0,
            Err(i) => (i - 1).min(n - 2),
        };
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - x) / h;
        let b = (x - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }
}

/// Tensor-product spline over a regular (x, y) grid.
///
/// Built once per table: one spline per x-row along y, plus a cross spline
/// along x constructed at query time from the row values.
#[derive(Debug, Clone)]
pub struct Grid2 {
    x: Vec<f64>,
    rows: Vec<CubicSpline>,
}

impl Grid2 {
    /// `values[i][j]` is the sample at (x[i], y[j]).
    pub fn new(x: Vec<f64>, y: Vec<f64>, values: &[Vec<f64>]) -> MapResult<Self> {
        if values.len() != x.len() {
            return Err(MapError::BadGrid {
                what: "row count does not match x grid",
            });
        }
        let rows = values
            .iter()
            .map(|row| CubicSpline::new(y.clone(), row.clone()))
            .collect::<MapResult<Vec<_>>>()?;
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MapError::BadGrid {
                what: "grid x values must be strictly increasing",
            });
        }
        Ok(Self { x, rows })
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        if self.rows.len() == 1 {
            return self.rows[0].eval(y);
        }
        let column: Vec<f64> = self.rows.iter().map(|row| row.eval(y)).collect();
        // The cross spline is tiny (one knot per speed line); rebuilding it
        // per query keeps the table immutable after load.
        CubicSpline::new(self.x.clone(), column)
            .map(|s| s.eval(x))
            .unwrap_or(f64::NAN)
    }
}
