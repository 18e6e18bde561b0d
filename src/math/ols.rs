//! Weighted ridge least squares.
//!
//! The bundled ranker repeatedly solves small regression problems of the form:
//!
//! ```text
//! minimize Σ w_i (y_i - b0 - x_i^T β)^2 + α ||β||^2
//! ```
//!
//! Implementation choices:
//! - Rows are scaled by `sqrt(w_i)` and the penalty is appended as `sqrt(α)`
//!   rows, turning the problem into an ordinary least squares one.
//! - The intercept column is never penalized.
//! - SVD is used so tall and near-singular systems solve robustly.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Weighted ridge regression with an unpenalized intercept.
///
/// `x` holds one row per observation (no intercept column). Returns
/// `[b0, β1, ..., βp]`, or `None` when inputs are inconsistent or the solve fails.
pub fn solve_ridge(x: &DMatrix<f64>, y: &[f64], w: &[f64], alpha: f64) -> Option<DVector<f64>> {
    let n = x.nrows();
    let p = x.ncols();
    if n == 0 || y.len() != n || w.len() != n || !(alpha.is_finite() && alpha >= 0.0) {
        return None;
    }

    let extra = if alpha > 0.0 { p } else { 0 };
    let mut xa = DMatrix::<f64>::zeros(n + extra, p + 1);
    let mut ya = DVector::<f64>::zeros(n + extra);

    for i in 0..n {
        if !(w[i].is_finite() && w[i] > 0.0) {
            return None;
        }
        let sw = w[i].sqrt();
        xa[(i, 0)] = sw;
        for j in 0..p {
            xa[(i, j + 1)] = x[(i, j)] * sw;
        }
        ya[i] = y[i] * sw;
    }

    if extra > 0 {
        let sa = alpha.sqrt();
        for j in 0..p {
            xa[(n + j, j + 1)] = sa;
        }
    }

    solve_least_squares(&xa, &ya)
}
