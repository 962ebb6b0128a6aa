//! Export per-element fit results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::domain::{FitResult, Phase};
use crate::error::AppError;

/// Write one row per fit result of a chip/phase step.
///
/// `Unset` results are written with empty value columns so row counts match
/// the fitted series.
pub fn write_fits_csv(path: &Path, chip: u32, phase: Phase, fits: &[FitResult]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", parent.display())))?;
        }
    }

    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(
        file,
        "chip,phase,element,constant,constant_err,mu,mu_err,sigma,sigma_err,chi2,ndf"
    )
    .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for result in fits {
        let element = result.index().map(|i| i.to_string()).unwrap_or_default();
        let values = match result.fit() {
            Some(f) => format!(
                "{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{}",
                f.constant, f.constant_err, f.mean, f.mean_err, f.sigma, f.sigma_err, f.chi2, f.ndf
            ),
            None => ",,,,,,,".to_string(),
        };
        writeln!(file, "{chip},{phase},{element},{values}")
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
