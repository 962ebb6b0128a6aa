//! Linear least squares solver.
//!
//! The Gaussian fitter solves one small damped linear system per iteration:
//!
//! ```text
//! minimize ‖J δ - r‖² + λ ‖D δ‖²
//! ```
//!
//! which is an ordinary least squares problem on the stacked matrix `[J; √λ D]`
//! against `[r; 0]`. The matrix is tall (many scan points, three parameters), so
//! we solve it with SVD rather than QR.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Progressively looser tolerances; a flat scan region can make the sigma
    // column nearly vanish.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped system `(JᵀJ + λ·diag(JᵀJ)) δ = Jᵀ r` via the stacked form.
pub fn solve_damped(jacobian: &DMatrix<f64>, residuals: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let (n, p) = jacobian.shape();
    let mut a = DMatrix::<f64>::zeros(n + p, p);
    let mut b = DVector::<f64>::zeros(n + p);

    a.view_mut((0, 0), (n, p)).copy_from(jacobian);
    b.rows_mut(0, n).copy_from(residuals);

    for j in 0..p {
        let col_norm_sq: f64 = jacobian.column(j).iter().map(|v| v * v).sum();
        a[(n + j, j)] = (lambda * col_norm_sq.max(1e-12)).sqrt();
    }

    solve_least_squares(&a, &b)
}
