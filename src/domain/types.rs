//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - passed between the curve processor and the floorplan compositor
//! - written into the JSON analysis archive
//! - exported to CSV for downstream scripts

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One scan step: scan parameter `x` and measured value `y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Raw threshold scan for one sensor element.
///
/// `x` is non-decreasing along the series. Construction validates this so the
/// integration never sees a negative segment width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    name: String,
    points: Vec<Point>,
}

impl RawSeries {
    pub fn new(name: impl Into<String>, points: Vec<Point>) -> Result<Self, AppError> {
        let name = name.into();
        if let Some(w) = points.windows(2).find(|w| !(w[1].x >= w[0].x)) {
            return Err(AppError::invalid_input(format!(
                "Series '{name}' is not ordered in x ({} followed by {}).",
                w[0].x, w[1].x
            )));
        }
        Ok(Self { name, points })
    }

    /// Build a series from parallel `x`/`y` slices.
    pub fn from_xy(name: impl Into<String>, xs: &[f64], ys: &[f64]) -> Result<Self, AppError> {
        let name = name.into();
        if xs.len() != ys.len() {
            return Err(AppError::invalid_input(format!(
                "Series '{name}' has {} x values but {} y values.",
                xs.len(),
                ys.len()
            )));
        }
        let points = xs.iter().zip(ys).map(|(&x, &y)| Point::new(x, y)).collect();
        Self::new(name, points)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Series derived from a [`RawSeries`] (integrated or normalized).
///
/// Same x-domain as its source; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    name: String,
    points: Vec<Point>,
}

impl DerivedSeries {
    pub(crate) fn new(name: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last y-value, used as the normalization denominator.
    pub fn plateau(&self) -> Option<f64> {
        self.points.last().map(|p| p.y)
    }
}

/// Parameters returned by a Gaussian fit routine.
///
/// Model: `constant * exp(-0.5 * ((x - mean) / sigma)^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianFit {
    pub constant: f64,
    pub constant_err: f64,
    pub mean: f64,
    pub mean_err: f64,
    pub sigma: f64,
    pub sigma_err: f64,
    pub chi2: f64,
    pub ndf: u32,
}

/// Outcome of one Gaussian fit for one element.
///
/// `Unset` is the explicit "no fit, no index" value. A `Measured` result always
/// carries fit values; its index is `None` when the caller supplied no
/// numbering for the fitted curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FitResult {
    #[default]
    Unset,
    Measured { index: Option<u32>, fit: GaussianFit },
}

impl FitResult {
    pub fn measured(index: Option<u32>, fit: GaussianFit) -> Self {
        FitResult::Measured { index, fit }
    }

    pub fn index(&self) -> Option<u32> {
        match self {
            FitResult::Unset => None,
            FitResult::Measured { index, .. } => *index,
        }
    }

    pub fn fit(&self) -> Option<&GaussianFit> {
        match self {
            FitResult::Unset => None,
            FitResult::Measured { fit, .. } => Some(fit),
        }
    }
}

/// Measurement condition of a calibration scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    Post,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Pre, Phase::Post];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Post => "post",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named group of series held by the curve processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesGroup {
    /// Raw differential scans as loaded.
    Measurements,
    /// Integrated (and possibly normalized) curves.
    Scurves,
}

impl SeriesGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            SeriesGroup::Measurements => "measurements",
            SeriesGroup::Scurves => "scurves",
        }
    }
}
