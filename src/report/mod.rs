//! Reporting utilities: per chip/phase fit statistics.

use crate::domain::{FitResult, GaussianFit, Phase};

pub mod format;

pub use format::*;

/// Aggregate of the fit results of one chip and phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipSummary {
    pub chip: u32,
    pub phase: Phase,
    pub fitted: usize,
    pub unset: usize,
    pub mean_mu: f64,
    /// Pixel-to-pixel standard deviation of the fitted mean.
    pub spread_mu: f64,
    pub mean_sigma: f64,
    pub mean_chi2_ndf: f64,
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Summarize the fit results of one chip/phase step.
///
/// Averages are `NaN` when nothing was fitted.
pub fn summarize(chip: u32, phase: Phase, fits: &[FitResult]) -> ChipSummary {
    let measured: Vec<&GaussianFit> = fits.iter().filter_map(FitResult::fit).collect();
    let n = measured.len();

    let mean_mu = average(measured.iter().map(|m| m.mean));
    let spread_mu = if n < 2 {
        0.0
    } else {
        let var = measured.iter().map(|m| (m.mean - mean_mu).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    };

    ChipSummary {
        chip,
        phase,
        fitted: n,
        unset: fits.len() - n,
        mean_mu,
        spread_mu,
        mean_sigma: average(measured.iter().map(|m| m.sigma)),
        mean_chi2_ndf: average(
            measured
                .iter()
                .map(|m| if m.ndf == 0 { f64::NAN } else { m.chi2 / f64::from(m.ndf) }),
        ),
    }
}
