//! Sigma seed generation.
//!
//! Levenberg–Marquardt converges to the nearest local minimum, and a Gaussian
//! started far too narrow sees a flat chi² surface. We therefore start from a
//! small log-spaced grid of widths around the moment estimate and keep the best.

use crate::error::AppError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::configuration(format!(
            "Invalid seed range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::configuration("Seed steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

/// Sigma seeds spanning a factor of four either side of `sigma0`.
///
/// The moment estimate itself is always the first seed. Seeds are bounded
/// below by a thousandth of the scan span so a spike cannot produce a
/// degenerate width.
pub fn sigma_seeds(sigma0: f64, span: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    let floor = (span * 1e-3).max(f64::MIN_POSITIVE);
    let center = sigma0.abs().max(floor);
    let mut out = vec![center];
    if steps >= 2 {
        let lo = (center / 4.0).max(floor);
        let hi = (center * 4.0).max(lo * 2.0);
        out.extend(log_space(lo, hi, steps)?);
    }
    Ok(out)
}
