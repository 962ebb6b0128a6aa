//! Synthetic threshold scans.
//!
//! Every pixel gets a threshold drawn from `Normal(threshold_mean, spread)`,
//! where the spread depends on the phase (trimming narrows it after
//! calibration). Its differential response is a Gaussian bump of height
//! `hits` and width `noise_width` around that threshold, plus counting noise
//! with standard deviation `sqrt(y + 1)`.
//!
//! Runs are reproducible: the generator seed is the profile seed combined
//! with the chip and the phase by plain bit arithmetic.

use std::path::PathBuf;

use log::info;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::domain::{Phase, Point};
use crate::error::AppError;
use crate::io::write_scan_csv;
use crate::models::predict;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProfile {
    /// Scan steps `0..steps`, one DAC unit apart.
    pub steps: usize,
    pub threshold_mean: f64,
    /// Pixel-to-pixel threshold spread before calibration.
    pub spread_pre: f64,
    /// Pixel-to-pixel threshold spread after calibration.
    pub spread_post: f64,
    /// Width of a single pixel's response.
    pub noise_width: f64,
    /// Peak height of the differential response.
    pub hits: f64,
    pub seed: u64,
}

impl Default for ScanProfile {
    fn default() -> Self {
        Self {
            steps: 256,
            threshold_mean: 120.0,
            spread_pre: 12.0,
            spread_post: 3.0,
            noise_width: 5.0,
            hits: 200.0,
            seed: 42,
        }
    }
}

impl ScanProfile {
    fn spread(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Pre => self.spread_pre,
            Phase::Post => self.spread_post,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.steps < 8 {
            return Err(AppError::configuration("Scan needs at least 8 steps."));
        }
        let positive = [self.noise_width, self.hits];
        let non_negative = [self.spread_pre, self.spread_post];
        if !(positive.iter().all(|v| v.is_finite() && *v > 0.0)
            && non_negative.iter().all(|v| v.is_finite() && *v >= 0.0)
            && self.threshold_mean.is_finite())
        {
            return Err(AppError::configuration("Invalid scan profile: widths and hits must be positive and finite."));
        }
        Ok(())
    }
}

/// Generator seed of one chip and phase; distinct for every (chip, phase) pair.
fn scan_seed(profile: &ScanProfile, chip: u32, phase: Phase) -> u64 {
    let phase_bit = match phase {
        Phase::Pre => 0,
        Phase::Post => 1,
    };
    profile.seed ^ (u64::from(chip) << 1) ^ phase_bit
}

/// Differential scans of `pixels` for one chip and phase.
pub fn simulate_chip(
    profile: &ScanProfile,
    chip: u32,
    phase: Phase,
    pixels: &[u32],
) -> Result<Vec<(u32, Vec<Point>)>, AppError> {
    profile.validate()?;

    let mut rng = StdRng::seed_from_u64(scan_seed(profile, chip, phase));
    let thresholds = Normal::new(profile.threshold_mean, profile.spread(phase))
        .map_err(|e| AppError::configuration(format!("Threshold distribution error: {e}")))?;
    let noise = Normal::new(0.0, 1.0).map_err(|e| AppError::configuration(format!("Noise distribution error: {e}")))?;

    let mut scans = Vec::with_capacity(pixels.len());
    for &pixel in pixels {
        let threshold = thresholds.sample(&mut rng);
        let params = [profile.hits, threshold, profile.noise_width];
        let points = (0..profile.steps)
            .map(|step| {
                let x = step as f64;
                let y = predict(x, &params);
                Point::new(x, y + (y + 1.0).sqrt() * noise.sample(&mut rng))
            })
            .collect();
        scans.push((pixel, points));
    }
    Ok(scans)
}

/// Write one scan file per chip and phase of `config`, at its input paths.
pub fn write_simulated_run(config: &RunConfig, profile: &ScanProfile) -> Result<Vec<PathBuf>, AppError> {
    let pixels: Vec<u32> = match &config.pixels {
        Some(p) => config.filter_pixels(p).0,
        None => (0..config.pixels_per_chip).collect(),
    };

    let mut written = Vec::new();
    for &chip in &config.chips {
        for &phase in &config.phases {
            let scans = simulate_chip(profile, chip, phase, &pixels)?;
            let path = config.input_path(chip, phase);
            write_scan_csv(&path, &scans)?;
            info!("Wrote {} pixels for chip {chip} {phase} to '{}'", scans.len(), path.display());
            written.push(path);
        }
    }
    Ok(written)
}
