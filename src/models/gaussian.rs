//! Gaussian model evaluation.
//!
//! Parameter order is `[constant, mean, sigma]`:
//!
//! ```text
//! g(x) = c · exp(-½ ((x - μ) / σ)²)
//! ```
//!
//! The fitter relies on two primitive operations:
//! - predict `g(x)` for residuals and plots
//! - fill a Jacobian row `∂g/∂(c, μ, σ)` for the damped Gauss–Newton step

/// Number of free parameters of the model.
pub const GAUSSIAN_PARAMS: usize = 3;

/// Evaluate the Gaussian at `x`.
pub fn predict(x: f64, params: &[f64; GAUSSIAN_PARAMS]) -> f64 {
    let [c, mu, sigma] = *params;
    let z = (x - mu) / sigma;
    c * (-0.5 * z * z).exp()
}

/// Fill the Jacobian row for `x`.
pub fn fill_jacobian_row(x: f64, params: &[f64; GAUSSIAN_PARAMS], out: &mut [f64; GAUSSIAN_PARAMS]) {
    let [c, mu, sigma] = *params;
    let dx = x - mu;
    let s2 = sigma * sigma;
    let e = (-0.5 * dx * dx / s2).exp();

    out[0] = e;
    out[1] = c * e * dx / s2;
    out[2] = c * e * dx * dx / (s2 * sigma);
}
