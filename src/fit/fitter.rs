//! Gaussian fit routine.
//!
//! The curve processor only depends on the [`GaussianFitter`] trait; any
//! routine that turns a point series into parameter values, parameter errors,
//! chi² and degrees of freedom can be plugged in.
//!
//! [`LevenbergMarquardt`] is the routine used by the `scurve` binary. Given
//! points `(x_i, y_i)` it:
//! - estimates constant/mean/sigma from the first two moments of `|y|`
//! - refines each sigma seed with damped Gauss–Newton steps (parallel)
//! - keeps the lowest-chi² candidate (ties broken by seed order)
//! - derives parameter errors from `(JᵀJ)⁻¹ · chi²/ndf`
//!
//! Points carry no individual errors, so chi² is the plain sum of squared
//! residuals.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{GaussianFit, Point};
use crate::error::AppError;
use crate::fit::seeds::sigma_seeds;
use crate::math::solve_damped;
use crate::models::{GAUSSIAN_PARAMS, fill_jacobian_row, predict};

/// A routine that fits a Gaussian to a point series.
pub trait GaussianFitter {
    fn fit(&self, points: &[Point]) -> Result<GaussianFit, AppError>;
}

/// Options for the Levenberg–Marquardt fitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Maximum number of accepted or rejected steps per seed.
    pub max_iterations: usize,
    /// Number of log-spaced sigma seeds in addition to the moment estimate.
    pub sigma_seeds: usize,
    /// Relative chi² improvement below which a seed is considered converged.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            sigma_seeds: 8,
            tolerance: 1e-10,
        }
    }
}

/// Damped least squares Gaussian fitter.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    opts: FitOptions,
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    params: [f64; GAUSSIAN_PARAMS],
    chi2: f64,
}

impl LevenbergMarquardt {
    pub fn new(opts: FitOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &FitOptions {
        &self.opts
    }
}

impl GaussianFitter for LevenbergMarquardt {
    fn fit(&self, points: &[Point]) -> Result<GaussianFit, AppError> {
        let n = points.len();
        if n <= GAUSSIAN_PARAMS {
            return Err(AppError::fit_unavailable(format!(
                "Gaussian fit needs at least {} points, got {n}.",
                GAUSSIAN_PARAMS + 1
            )));
        }

        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(AppError::fit_unavailable("Series contains non-finite values."));
        }

        let seed = moment_seed(&x, &y)
            .ok_or_else(|| AppError::fit_unavailable("Series has no signal to fit (all values are zero)."))?;
        let span = x[n - 1] - x[0];
        if span <= 0.0 {
            return Err(AppError::fit_unavailable("Series has zero extent in x."));
        }

        let seeds = sigma_seeds(seed[2], span, self.opts.sigma_seeds)?;

        // Refine each seed independently (parallel).
        let candidates: Vec<Candidate> = seeds
            .par_iter()
            .enumerate()
            .filter_map(|(idx, &sigma)| {
                refine(&x, &y, [seed[0], seed[1], sigma], &self.opts).map(|(params, chi2)| Candidate {
                    idx,
                    params,
                    chi2,
                })
            })
            .collect();

        if candidates.is_empty() {
            return Err(AppError::fit_unavailable("No seed converged to a finite Gaussian."));
        }

        // Deterministic selection: pick the minimum chi²; break ties by seed order.
        let mut best = &candidates[0];
        for c in &candidates[1..] {
            if c.chi2 < best.chi2 || (c.chi2 == best.chi2 && c.idx < best.idx) {
                best = c;
            }
        }

        let ndf = n - GAUSSIAN_PARAMS;
        let errors = parameter_errors(&x, &best.params, best.chi2, ndf)
            .ok_or_else(|| AppError::fit_unavailable("Fit covariance is singular; parameters are not determined."))?;

        Ok(GaussianFit {
            constant: best.params[0],
            constant_err: errors[0],
            mean: best.params[1],
            mean_err: errors[1],
            sigma: best.params[2],
            sigma_err: errors[2],
            chi2: best.chi2,
            ndf: ndf as u32,
        })
    }
}

/// Initial `[constant, mean, sigma]` from the moments of `|y|`.
fn moment_seed(x: &[f64], y: &[f64]) -> Option<[f64; GAUSSIAN_PARAMS]> {
    let mut peak = 0usize;
    let mut sw = 0.0;
    let mut sx = 0.0;
    for (i, (&xi, &yi)) in x.iter().zip(y).enumerate() {
        if yi.abs() > y[peak].abs() {
            peak = i;
        }
        let w = yi.abs();
        sw += w;
        sx += w * xi;
    }
    if sw <= 0.0 {
        return None;
    }
    let mean = sx / sw;
    let var = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| yi.abs() * (xi - mean) * (xi - mean))
        .sum::<f64>()
        / sw;

    Some([y[peak], mean, var.sqrt()])
}

fn chi_square(x: &[f64], y: &[f64], params: &[f64; GAUSSIAN_PARAMS]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - predict(xi, params);
            r * r
        })
        .sum()
}

fn jacobian(x: &[f64], params: &[f64; GAUSSIAN_PARAMS]) -> DMatrix<f64> {
    let mut j = DMatrix::<f64>::zeros(x.len(), GAUSSIAN_PARAMS);
    let mut row = [0.0; GAUSSIAN_PARAMS];
    for (i, &xi) in x.iter().enumerate() {
        fill_jacobian_row(xi, params, &mut row);
        for k in 0..GAUSSIAN_PARAMS {
            j[(i, k)] = row[k];
        }
    }
    j
}

/// Run damped Gauss–Newton iterations from `init`.
///
/// Returns `None` if the starting point is not finite, or if no step was
/// accepted and the damping never ran out (the start was not refined).
fn refine(
    x: &[f64],
    y: &[f64],
    init: [f64; GAUSSIAN_PARAMS],
    opts: &FitOptions,
) -> Option<([f64; GAUSSIAN_PARAMS], f64)> {
    let mut params = init;
    let mut chi2 = chi_square(x, y, &params);
    if !chi2.is_finite() {
        return None;
    }

    // Set once a step is accepted or `init` is shown to be stationary.
    let mut settled = false;
    let mut lambda = 1e-3;
    for _ in 0..opts.max_iterations {
        let j = jacobian(x, &params);
        let r = DVector::from_iterator(x.len(), x.iter().zip(y).map(|(&xi, &yi)| yi - predict(xi, &params)));

        let Some(delta) = solve_damped(&j, &r, lambda) else {
            break;
        };

        let trial = [params[0] + delta[0], params[1] + delta[1], params[2] + delta[2]];
        let trial_chi2 = if trial[2] != 0.0 && trial.iter().all(|v| v.is_finite()) {
            chi_square(x, y, &trial)
        } else {
            f64::INFINITY
        };

        if trial_chi2 < chi2 {
            let improvement = chi2 - trial_chi2;
            params = trial;
            chi2 = trial_chi2;
            settled = true;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement <= opts.tolerance * chi2.max(opts.tolerance) {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                settled = true;
                break;
            }
        }
    }

    if !settled {
        return None;
    }
    params[2] = params[2].abs();
    Some((params, chi2))
}

fn parameter_errors(
    x: &[f64],
    params: &[f64; GAUSSIAN_PARAMS],
    chi2: f64,
    ndf: usize,
) -> Option<[f64; GAUSSIAN_PARAMS]> {
    let j = jacobian(x, params);
    let jtj = j.transpose() * &j;
    let cov = jtj.try_inverse()?;
    let scale = chi2 / ndf as f64;

    let mut out = [0.0; GAUSSIAN_PARAMS];
    for k in 0..GAUSSIAN_PARAMS {
        let var = cov[(k, k)] * scale;
        if !(var.is_finite() && var >= 0.0) {
            return None;
        }
        out[k] = var.sqrt();
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn gaussian_points(c: f64, mu: f64, sigma: f64, xs: impl Iterator<Item = f64>) -> Vec<Point> {
        xs.map(|x| Point::new(x, predict(x, &[c, mu, sigma]))).collect()
    }

    #[test]
    fn recovers_exact_gaussian() {
        let points = gaussian_points(120.0, 42.0, 3.5, (0..100).map(|i| i as f64));
        let fit = LevenbergMarquardt::default().fit(&points).unwrap();

        assert!((fit.constant - 120.0).abs() < 1e-6, "constant {}", fit.constant);
        assert!((fit.mean - 42.0).abs() < 1e-6, "mean {}", fit.mean);
        assert!((fit.sigma - 3.5).abs() < 1e-6, "sigma {}", fit.sigma);
        assert!(fit.chi2 < 1e-6);
        assert_eq!(fit.ndf, 97);
    }

    #[test]
    fn noisy_gaussian_has_positive_errors() {
        // Deterministic "noise": alternating offsets.
        let points: Vec<Point> = (0..60)
            .map(|i| {
                let x = i as f64;
                let bump = if i % 2 == 0 { 0.8 } else { -0.8 };
                Point::new(x, predict(x, &[50.0, 30.0, 4.0]) + bump)
            })
            .collect();
        let fit = LevenbergMarquardt::default().fit(&points).unwrap();

        assert!((fit.mean - 30.0).abs() < 0.5, "mean {}", fit.mean);
        assert!((fit.sigma - 4.0).abs() < 0.5, "sigma {}", fit.sigma);
        assert!(fit.mean_err > 0.0 && fit.mean_err.is_finite());
        assert!(fit.sigma_err > 0.0 && fit.sigma_err.is_finite());
        assert!(fit.constant_err > 0.0 && fit.constant_err.is_finite());
        assert!(fit.chi2 > 0.0);
    }

    #[test]
    fn negative_peak_is_fitted_with_negative_constant() {
        let points = gaussian_points(-8.0, 12.0, 2.0, (0..40).map(|i| i as f64 * 0.5));
        let fit = LevenbergMarquardt::default().fit(&points).unwrap();
        assert!((fit.constant + 8.0).abs() < 1e-6);
        assert!(fit.sigma > 0.0);
    }

    #[test]
    fn too_few_points_is_unavailable() {
        let points = vec![Point::new(0.0, 1.0), Point::new(1.0, 2.0), Point::new(2.0, 1.0)];
        let err = LevenbergMarquardt::default().fit(&points).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FitUnavailable);
    }

    #[test]
    fn unrefined_start_is_not_a_fit() {
        let points = gaussian_points(50.0, 30.0, 4.0, (0..60).map(|i| i as f64));
        let (x, y): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p.x, p.y)).unzip();
        let opts = FitOptions {
            max_iterations: 0,
            ..FitOptions::default()
        };
        assert!(refine(&x, &y, [40.0, 28.0, 5.0], &opts).is_none());

        let err = LevenbergMarquardt::new(opts).fit(&points).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FitUnavailable);
    }

    #[test]
    fn exact_start_is_kept_as_stationary() {
        let points = gaussian_points(50.0, 30.0, 4.0, (0..60).map(|i| i as f64));
        let (x, y): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p.x, p.y)).unzip();
        let (params, chi2) = refine(&x, &y, [50.0, 30.0, 4.0], &FitOptions::default()).unwrap();
        assert_eq!(params, [50.0, 30.0, 4.0]);
        assert_eq!(chi2, 0.0);
    }

    #[test]
    fn flat_zero_series_is_unavailable() {
        let points: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 0.0)).collect();
        let err = LevenbergMarquardt::default().fit(&points).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FitUnavailable);
    }
}
