//! Run configuration.
//!
//! A run is described by a YAML file:
//!
//! ```yaml
//! input: data/scan_{chip}_{phase}.csv
//! output_dir: output
//! archive: scurve.json
//! chips: [0, 1, 2, 3, 4, 5]
//! pixels: [0, 1, 2]        # optional, all pixels in the file by default
//! geometry:
//!   - [0, 1, 2, 3]
//!   - [4, 5, 6, 7]
//! fit:
//!   max_iterations: 200
//! ```
//!
//! Every field has a default. `SCURVE_OUTPUT_DIR` (environment or `.env`)
//! overrides `output_dir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::domain::Phase;
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::geometry::rectangular_layout;

/// Environment variable overriding [`RunConfig::output_dir`].
pub const OUTPUT_DIR_ENV: &str = "SCURVE_OUTPUT_DIR";

/// Fields that must be YAML sequences when present.
const SEQUENCE_FIELDS: [&str; 3] = ["geometry", "chips", "pixels"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Scan file pattern; `{chip}` and `{phase}` are substituted.
    #[serde(default = "default_input")]
    pub input: String,

    /// Root of all written files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Archive file name, relative to `output_dir`.
    #[serde(default = "default_archive")]
    pub archive: String,

    /// Chips in processing order; the position in this list is the chip's
    /// logical position on the assembly.
    #[serde(default = "default_chips")]
    pub chips: Vec<u32>,

    /// Phases processed for every chip.
    #[serde(default = "default_phases")]
    pub phases: Vec<Phase>,

    /// Pixels to process; every pixel present in the scan file when absent.
    #[serde(default)]
    pub pixels: Option<Vec<u32>>,

    /// Pixels outside `0..pixels_per_chip` are dropped.
    #[serde(default = "default_pixels_per_chip")]
    pub pixels_per_chip: u32,

    /// Rows of pixel indices, top row first.
    #[serde(default = "default_geometry")]
    pub geometry: Vec<Vec<u32>>,

    #[serde(default)]
    pub fit: FitOptions,

    /// Also process every pixel on its own before the all-pixel pass.
    #[serde(default)]
    pub per_pixel: bool,

    /// Draw SVG files next to the archive entries.
    #[serde(default = "default_render")]
    pub render: bool,

    /// X-axis title of series charts.
    #[serde(default = "default_axis_title")]
    pub axis_title: String,
}

fn default_input() -> String {
    "data/scan_{chip}_{phase}.csv".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_archive() -> String {
    "scurve.json".to_string()
}

fn default_chips() -> Vec<u32> {
    vec![0]
}

fn default_phases() -> Vec<Phase> {
    Phase::ALL.to_vec()
}

fn default_pixels_per_chip() -> u32 {
    48
}

fn default_geometry() -> Vec<Vec<u32>> {
    rectangular_layout(3, 16, 0)
}

fn default_render() -> bool {
    true
}

fn default_axis_title() -> String {
    "Threshold (DAC)".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output_dir: default_output_dir(),
            archive: default_archive(),
            chips: default_chips(),
            phases: default_phases(),
            pixels: None,
            pixels_per_chip: default_pixels_per_chip(),
            geometry: default_geometry(),
            fit: FitOptions::default(),
            per_pixel: false,
            render: default_render(),
            axis_title: default_axis_title(),
        }
    }
}

fn yaml_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Reject non-sequence values where a list is required.
fn check_sequences(doc: &Value) -> Result<(), AppError> {
    let Value::Mapping(map) = doc else {
        return Err(AppError::type_mismatch(format!(
            "Run configuration must be a mapping, got {}.",
            yaml_type(doc)
        )));
    };

    for field in SEQUENCE_FIELDS {
        match map.get(field) {
            None | Some(Value::Sequence(_)) => {}
            Some(Value::Null) if field == "pixels" => {}
            Some(other) => {
                return Err(AppError::type_mismatch(format!(
                    "`{field}` must be a sequence, got {}.",
                    yaml_type(other)
                )));
            }
        }
    }

    if let Some(Value::Sequence(rows)) = map.get("geometry") {
        for (i, row) in rows.iter().enumerate() {
            if !matches!(row, Value::Sequence(_)) {
                return Err(AppError::type_mismatch(format!(
                    "`geometry` row {i} must be a sequence, got {}.",
                    yaml_type(row)
                )));
            }
        }
    }
    Ok(())
}

impl RunConfig {
    /// Parse a configuration document.
    pub fn from_yaml_str(text: &str) -> Result<Self, AppError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: Value = serde_yaml::from_str(text)
            .map_err(|e| AppError::configuration(format!("Invalid run configuration: {e}")))?;
        check_sequences(&doc)?;
        serde_yaml::from_value(doc).map_err(|e| AppError::configuration(format!("Invalid run configuration: {e}")))
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read config '{}': {e}", path.display())))?;
        Self::from_yaml_str(&text).map_err(|e| {
            AppError::new(e.kind(), e.exit_code(), format!("{}: {}", path.display(), e.message()))
        })
    }

    /// Apply a `SCURVE_OUTPUT_DIR` value, ignoring empty strings.
    pub fn apply_output_override(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|d| !d.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir.trim_end_matches('/'));
        }
    }

    /// Read `.env` and the process environment for overrides.
    pub fn apply_env(&mut self) {
        dotenvy::dotenv().ok();
        self.apply_output_override(std::env::var(OUTPUT_DIR_ENV).ok());
    }

    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.archive)
    }

    /// Scan file of one chip and phase.
    pub fn input_path(&self, chip: u32, phase: Phase) -> PathBuf {
        PathBuf::from(
            self.input
                .replace("{chip}", &chip.to_string())
                .replace("{phase}", phase.as_str()),
        )
    }

    /// Output directory of one chip and phase, e.g. `output/3_post`.
    pub fn chip_directory(&self, chip: u32, phase: Phase) -> String {
        self.output_dir.join(format!("{chip}_{phase}")).to_string_lossy().into_owned()
    }

    pub fn composite_directory(&self) -> String {
        self.output_dir
            .join(crate::floorplan::COMPOSITE_DIRECTORY)
            .to_string_lossy()
            .into_owned()
    }

    /// Split requested pixels into those inside `0..pixels_per_chip` and the dropped rest.
    pub fn filter_pixels(&self, requested: &[u32]) -> (Vec<u32>, Vec<u32>) {
        requested.iter().partition(|&&p| p < self.pixels_per_chip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_document_gives_defaults() {
        let config = RunConfig::from_yaml_str("").unwrap();
        assert_eq!(config.chips, vec![0]);
        assert_eq!(config.phases, vec![Phase::Pre, Phase::Post]);
        assert_eq!(config.pixels_per_chip, 48);
        assert_eq!(config.geometry.len(), 3);
        assert_eq!(config.geometry[2][15], 47);
        assert!(config.render);
    }

    #[test]
    fn fields_override_defaults() {
        let yaml = "chips: [2, 0]\npixels: [1, 2]\ngeometry:\n  - [1, 2]\nfit:\n  sigma_seeds: 3\nper_pixel: true\n";
        let config = RunConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.chips, vec![2, 0]);
        assert_eq!(config.pixels, Some(vec![1, 2]));
        assert_eq!(config.geometry, vec![vec![1, 2]]);
        assert_eq!(config.fit.sigma_seeds, 3);
        assert_eq!(config.fit.max_iterations, 200);
        assert!(config.per_pixel);
    }

    #[test]
    fn scalar_where_sequence_required_is_type_mismatch() {
        for yaml in ["chips: 3", "geometry: [[1, 2], 3]", "pixels: all", "geometry: {a: 1}"] {
            let err = RunConfig::from_yaml_str(yaml).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TypeMismatch, "{yaml}");
        }
        assert!(RunConfig::from_yaml_str("pixels: null").is_ok());
        assert_eq!(
            RunConfig::from_yaml_str("- 1\n- 2").unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        let err = RunConfig::from_yaml_str("chips: [-1]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = RunConfig::from_yaml_str("phases: [during]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(&path, "input: scans/{chip}-{phase}.csv\noutput_dir: results/\n").unwrap();
        let config = RunConfig::from_yaml(&path).unwrap();
        assert_eq!(config.input_path(4, Phase::Post), PathBuf::from("scans/4-post.csv"));
        assert_eq!(config.archive_path(), PathBuf::from("results/scurve.json"));
        assert_eq!(config.chip_directory(4, Phase::Pre), "results/4_pre");
    }

    #[test]
    fn output_override_replaces_directory() {
        let mut config = RunConfig::default();
        config.apply_output_override(Some("elsewhere/".to_string()));
        assert_eq!(config.output_dir, PathBuf::from("elsewhere"));
        config.apply_output_override(Some("  ".to_string()));
        config.apply_output_override(None);
        assert_eq!(config.output_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.composite_directory(), "elsewhere/composite");
    }

    #[test]
    fn pixels_outside_chip_are_dropped() {
        let config = RunConfig::default();
        let (kept, dropped) = config.filter_pixels(&[0, 47, 48, 100, 3]);
        assert_eq!(kept, vec![0, 47, 3]);
        assert_eq!(dropped, vec![48, 100]);
    }
}
