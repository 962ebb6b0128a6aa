//! Formatted terminal output.
//!
//! Formatting lives here so output changes stay localized.

use crate::config::RunConfig;
use crate::report::ChipSummary;

fn cell(v: f64, width: usize, precision: usize) -> String {
    if v.is_finite() {
        format!("{v:>width$.precision$}")
    } else {
        format!("{:>width$}", "-")
    }
}

/// Header lines describing the run.
pub fn format_run_header(config: &RunConfig) -> String {
    let mut out = String::new();
    out.push_str("=== scurve - S-curve calibration floorplan ===\n");
    out.push_str(&format!("Input: {}\n", config.input));
    out.push_str(&format!("Archive: {}\n", config.archive_path().display()));
    out.push_str(&format!(
        "Chips: {:?} | pixels/chip: {} | geometry: {} rows\n",
        config.chips,
        config.pixels_per_chip,
        config.geometry.len()
    ));
    out
}

/// One row per chip/phase step.
pub fn format_summary_table(summaries: &[ChipSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>5} {:>5} {:>7} {:>6} {:>10} {:>9} {:>9} {:>9}\n",
        "chip", "phase", "fitted", "unset", "<mu>", "rms(mu)", "<sigma>", "chi2/ndf"
    ));
    for s in summaries {
        out.push_str(&format!(
            "{:>5} {:>5} {:>7} {:>6} {} {} {} {}\n",
            s.chip,
            s.phase.as_str(),
            s.fitted,
            s.unset,
            cell(s.mean_mu, 10, 2),
            cell(s.spread_mu, 9, 2),
            cell(s.mean_sigma, 9, 2),
            cell(s.mean_chi2_ndf, 9, 2),
        ));
    }
    out
}
