//! Integration, normalization and fitting of scan series.
//!
//! Series are addressed through a selector: a list of [`SeriesGroup`]s whose
//! members are concatenated in the order given (`measurements` first if both
//! are listed that way). Selecting nothing is a configuration error.

use log::{debug, info};

use crate::domain::{DerivedSeries, FitResult, GaussianFit, Point, RawSeries, SeriesGroup};
use crate::error::AppError;
use crate::fit::GaussianFitter;
use crate::io::OutputTarget;
use crate::math::{cumulative_trapezoid, safe_divide};

/// One named curve of a [`SeriesPlot`].
#[derive(Debug, Clone, Copy)]
pub struct PlotSeries<'a> {
    pub name: &'a str,
    pub group: SeriesGroup,
    pub points: &'a [Point],
}

/// Everything a sink needs to persist and draw a set of series.
#[derive(Debug, Clone)]
pub struct SeriesPlot<'a> {
    pub title: &'a str,
    pub axis_x: &'a str,
    pub series: Vec<PlotSeries<'a>>,
    /// Fit drawn with its statistics box; only set when exactly one curve was fitted.
    pub fit: Option<GaussianFit>,
}

/// Destination of saved series.
pub trait SeriesSink {
    fn save_series(&mut self, target: &OutputTarget, plot: &SeriesPlot<'_>) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct CurveProcessor {
    target: OutputTarget,
    title: String,
    axis_x: String,
    measurements: Vec<RawSeries>,
    numbering: Vec<u32>,
    scurves: Vec<DerivedSeries>,
    fits: Vec<FitResult>,
    show_fit_stats: bool,
}

impl CurveProcessor {
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut OutputTarget {
        &mut self.target
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_axis_title(&mut self, axis_x: impl Into<String>) {
        self.axis_x = axis_x.into();
    }

    pub fn measurements(&self) -> &[RawSeries] {
        &self.measurements
    }

    pub fn scurves(&self) -> &[DerivedSeries] {
        &self.scurves
    }

    /// Fit results in the order they were produced. Never truncated except by [`reset`](Self::reset).
    pub fn fits(&self) -> &[FitResult] {
        &self.fits
    }

    pub fn show_fit_stats(&self) -> bool {
        self.show_fit_stats
    }

    /// Append raw series to the measurements group.
    pub fn fill_graphs(&mut self, series: impl IntoIterator<Item = RawSeries>) {
        self.measurements.extend(series);
    }

    /// Element numbers for fitted curves, by position within the selection.
    pub fn fill_numbering(&mut self, numbering: Vec<u32>) {
        self.numbering = numbering;
    }

    fn select(&self, selector: &[SeriesGroup]) -> Result<Vec<PlotSeries<'_>>, AppError> {
        let mut out = Vec::new();
        for &group in selector {
            match group {
                SeriesGroup::Measurements => out.extend(self.measurements.iter().map(|s| PlotSeries {
                    name: s.name(),
                    group,
                    points: s.points(),
                })),
                SeriesGroup::Scurves => out.extend(self.scurves.iter().map(|s| PlotSeries {
                    name: s.name(),
                    group,
                    points: s.points(),
                })),
            }
        }

        if out.is_empty() {
            let groups: Vec<&str> = selector.iter().map(|g| g.as_str()).collect();
            return Err(AppError::configuration(format!(
                "No series selected (groups: [{}]).",
                groups.join(", ")
            )));
        }
        Ok(out)
    }

    /// Fit every selected series and append one [`FitResult`] per series.
    ///
    /// If any fit is unavailable the error is returned and no result of this
    /// call is appended.
    pub fn fit_gaussian(&mut self, selector: &[SeriesGroup], fitter: &dyn GaussianFitter) -> Result<(), AppError> {
        let selected = self.select(selector)?;

        let mut results = Vec::with_capacity(selected.len());
        for (idx, series) in selected.iter().enumerate() {
            let fit = fitter.fit(series.points).map_err(|e| {
                AppError::new(
                    e.kind(),
                    e.exit_code(),
                    format!("Fit of series '{}' failed: {}", series.name, e.message()),
                )
            })?;
            let index = self.numbering.get(idx).copied();
            debug!(
                "Fitted series '{}': mu = {:.3} ± {:.3}, sigma = {:.3} ± {:.3}",
                series.name, fit.mean, fit.mean_err, fit.sigma, fit.sigma_err
            );
            results.push(FitResult::measured(index, fit));
        }

        self.show_fit_stats = results.len() == 1;
        info!("Fitted {} series", results.len());
        self.fits.extend(results);
        Ok(())
    }

    /// Append the cumulative trapezoidal integral of every selected series to
    /// the S-curve group.
    pub fn integrate_graphs(&mut self, selector: &[SeriesGroup]) -> Result<(), AppError> {
        let integrated: Vec<DerivedSeries> = self
            .select(selector)?
            .iter()
            .map(|s| {
                let x: Vec<f64> = s.points.iter().map(|p| p.x).collect();
                let y: Vec<f64> = s.points.iter().map(|p| p.y).collect();
                let points = x
                    .iter()
                    .zip(cumulative_trapezoid(&x, &y))
                    .map(|(&x, y)| Point::new(x, y))
                    .collect();
                DerivedSeries::new(s.name, points)
            })
            .collect();

        debug!("Integrated {} series", integrated.len());
        self.scurves.extend(integrated);
        Ok(())
    }

    /// Rewrite every S-curve as `-y / plateau`, with 0 for a zero plateau.
    pub fn normalize(&mut self) {
        self.scurves = self
            .scurves
            .iter()
            .map(|s| {
                let plateau = s.plateau().unwrap_or(0.0);
                let points = s
                    .points()
                    .iter()
                    .map(|p| Point::new(p.x, -safe_divide(p.y, plateau, 0.0)))
                    .collect();
                DerivedSeries::new(s.name(), points)
            })
            .collect();
    }

    /// Hand the selected series to `sink` under the current output target.
    pub fn save(&self, selector: &[SeriesGroup], sink: &mut dyn SeriesSink) -> Result<(), AppError> {
        let series = self.select(selector)?;
        let fit = if self.show_fit_stats {
            self.fits.last().and_then(|r| r.fit()).copied()
        } else {
            None
        };

        let plot = SeriesPlot {
            title: &self.title,
            axis_x: &self.axis_x,
            series,
            fit,
        };
        sink.save_series(&self.target, &plot)
    }

    /// Drop all series, numbering and fits. The output target is kept.
    pub fn reset(&mut self) {
        self.measurements.clear();
        self.numbering.clear();
        self.scurves.clear();
        self.fits.clear();
        self.show_fit_stats = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::math::integral;

    const MS: &[SeriesGroup] = &[SeriesGroup::Measurements];
    const SC: &[SeriesGroup] = &[SeriesGroup::Scurves];

    /// Returns the point count as the fitted mean.
    struct CountingFitter;

    impl GaussianFitter for CountingFitter {
        fn fit(&self, points: &[Point]) -> Result<GaussianFit, AppError> {
            Ok(GaussianFit {
                constant: 1.0,
                constant_err: 0.0,
                mean: points.len() as f64,
                mean_err: 0.0,
                sigma: 1.0,
                sigma_err: 0.0,
                chi2: 0.0,
                ndf: 0,
            })
        }
    }

    /// Fails on series shorter than three points.
    struct PickyFitter;

    impl GaussianFitter for PickyFitter {
        fn fit(&self, points: &[Point]) -> Result<GaussianFit, AppError> {
            if points.len() < 3 {
                return Err(AppError::fit_unavailable("too short"));
            }
            CountingFitter.fit(points)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        saved: Vec<(String, Vec<String>, bool)>,
    }

    impl SeriesSink for RecordingSink {
        fn save_series(&mut self, target: &OutputTarget, plot: &SeriesPlot<'_>) -> Result<(), AppError> {
            let names = plot.series.iter().map(|s| s.name.to_string()).collect();
            self.saved.push((target.name().to_string(), names, plot.fit.is_some()));
            Ok(())
        }
    }

    fn constant_series(name: &str) -> RawSeries {
        RawSeries::from_xy(name, &[0.0, 1.0, 2.0, 3.0], &[4.0, 4.0, 4.0, 4.0]).unwrap()
    }

    fn ys(series: &DerivedSeries) -> Vec<f64> {
        series.points().iter().map(|p| p.y).collect()
    }

    #[test]
    fn integrate_then_normalize_constant_curve() {
        let mut p = CurveProcessor::default();
        p.fill_graphs([constant_series("0")]);

        p.integrate_graphs(MS).unwrap();
        assert_eq!(ys(&p.scurves()[0]), vec![0.0, 4.0, 8.0, 12.0]);

        p.normalize();
        let normalized = ys(&p.scurves()[0]);
        let expected = [0.0, -1.0 / 3.0, -2.0 / 3.0, -1.0];
        for (got, want) in normalized.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        let xs: Vec<f64> = p.scurves()[0].points().iter().map(|pt| pt.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn integrated_values_match_trapezoid_prefix_sums() {
        let x = [0.0, 0.5, 2.0, 2.0, 5.0];
        let y = [1.0, 3.0, -2.0, 7.0, 0.5];
        let mut p = CurveProcessor::default();
        p.fill_graphs([RawSeries::from_xy("7", &x, &y).unwrap()]);
        p.integrate_graphs(MS).unwrap();

        let values = ys(&p.scurves()[0]);
        assert_eq!(values.len(), x.len());
        assert_eq!(values[0], 0.0);
        for (k, v) in values.iter().enumerate() {
            assert!((v - integral(&x, &y, 0, k)).abs() < 1e-12);
        }
    }

    #[test]
    fn normalize_with_nonzero_plateau() {
        let mut p = CurveProcessor::default();
        p.fill_graphs([RawSeries::from_xy("1", &[0.0, 1.0, 2.0], &[2.0, 6.0, 2.0]).unwrap()]);
        p.integrate_graphs(MS).unwrap();
        // integrated: [0, 4, 8]
        p.normalize();
        let values = ys(&p.scurves()[0]);
        assert_eq!(*values.last().unwrap(), -1.0);
        assert!((values[1] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_plateau_normalizes_to_zero() {
        let mut p = CurveProcessor::default();
        p.fill_graphs([RawSeries::from_xy("2", &[0.0, 1.0, 2.0], &[1.0, 0.0, -1.0]).unwrap()]);
        p.integrate_graphs(MS).unwrap();
        assert_eq!(p.scurves()[0].plateau(), Some(0.0));

        p.normalize();
        assert!(ys(&p.scurves()[0]).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn normalize_before_integration_is_empty() {
        let mut p = CurveProcessor::default();
        p.fill_graphs([constant_series("0")]);
        p.normalize();
        assert!(p.scurves().is_empty());
    }

    #[test]
    fn integration_appends_to_scurves() {
        let mut p = CurveProcessor::default();
        p.fill_graphs([constant_series("0"), constant_series("1")]);
        p.integrate_graphs(MS).unwrap();
        p.integrate_graphs(SC).unwrap();
        assert_eq!(p.scurves().len(), 4);
        // Second-order integral of the first curve: trapezoids of [0, 4, 8, 12].
        assert_eq!(ys(&p.scurves()[2]), vec![0.0, 2.0, 8.0, 18.0]);
    }

    #[test]
    fn empty_selection_is_a_configuration_error() {
        let mut p = CurveProcessor::default();
        assert_eq!(p.integrate_graphs(MS).unwrap_err().kind(), ErrorKind::Configuration);
        assert_eq!(
            p.fit_gaussian(&[], &CountingFitter).unwrap_err().kind(),
            ErrorKind::Configuration
        );
        p.fill_graphs([constant_series("0")]);
        assert_eq!(p.integrate_graphs(SC).unwrap_err().kind(), ErrorKind::Configuration);
    }

    #[test]
    fn fits_use_numbering_by_position() {
        let mut p = CurveProcessor::default();
        p.fill_graphs([constant_series("a"), constant_series("b"), constant_series("c")]);
        p.fill_numbering(vec![5, 9]);
        p.fit_gaussian(MS, &CountingFitter).unwrap();

        let indices: Vec<Option<u32>> = p.fits().iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![Some(5), Some(9), None]);
        assert!(!p.show_fit_stats());
    }

    #[test]
    fn fits_accumulate_and_single_fit_shows_stats() {
        let mut p = CurveProcessor::default();
        p.fill_graphs([constant_series("a")]);
        p.fit_gaussian(MS, &CountingFitter).unwrap();
        assert!(p.show_fit_stats());

        p.integrate_graphs(MS).unwrap();
        p.fit_gaussian(&[SeriesGroup::Measurements, SeriesGroup::Scurves], &CountingFitter)
            .unwrap();
        assert_eq!(p.fits().len(), 3);
        assert!(!p.show_fit_stats());
    }

    #[test]
    fn fit_failure_is_propagated_without_partial_results() {
        let mut p = CurveProcessor::default();
        p.fill_graphs([
            constant_series("ok"),
            RawSeries::from_xy("short", &[0.0, 1.0], &[1.0, 1.0]).unwrap(),
        ]);
        let err = p.fit_gaussian(MS, &PickyFitter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FitUnavailable);
        assert!(err.to_string().contains("'short'"), "{err}");
        assert!(p.fits().is_empty());
    }

    #[test]
    fn save_passes_selected_series_and_single_fit() {
        let mut p = CurveProcessor::new(OutputTarget::new("a.json", "dir", "scurve"));
        p.fill_graphs([constant_series("3")]);
        p.fit_gaussian(MS, &CountingFitter).unwrap();

        let mut sink = RecordingSink::default();
        p.save(MS, &mut sink).unwrap();
        assert_eq!(sink.saved, vec![("scurve".to_string(), vec!["3".to_string()], true)]);
        assert!(p.save(SC, &mut sink).is_err());
    }

    #[test]
    fn reset_keeps_output_target() {
        let mut p = CurveProcessor::new(OutputTarget::new("a.json", "out/0_pre/", "scurve"));
        p.fill_graphs([constant_series("0")]);
        p.fill_numbering(vec![0]);
        p.integrate_graphs(MS).unwrap();
        p.fit_gaussian(MS, &CountingFitter).unwrap();

        p.reset();
        assert!(p.measurements().is_empty());
        assert!(p.scurves().is_empty());
        assert!(p.fits().is_empty());
        assert_eq!(p.target().directory(), "out/0_pre");
        assert_eq!(p.target().name(), "scurve");
    }
}
