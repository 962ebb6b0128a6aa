//! SVG rendering of series overlays, single-chip maps and composite panels.
//!
//! All drawing goes through Plotters' SVG backend. Colour scales use the
//! viridis map; values outside a quantity's display range are drawn with the
//! end colour of the scale, the stored values are untouched.
//!
//! Plotters errors are boxed inside the drawing helpers and turned into
//! [`AppError`]s at the public functions.

use std::error::Error;
use std::fs;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::curve::SeriesPlot;
use crate::error::AppError;
use crate::floorplan::{CANVAS_COLUMNS, CANVAS_ROWS, CompositeCanvas, Grid, Quantity};
use crate::models::predict;

const SERIES_SIZE: (u32, u32) = (1000, 700);
const GRID_CELL_PX: u32 = 40;
const CANVAS_SIZE: (u32, u32) = (1500, 800);
const FONT_TITLE: u32 = 22;
const FONT_LABEL: u32 = 14;
const FIT_SAMPLES: usize = 400;

type DrawResult = Result<(), Box<dyn Error>>;

/// Viridis colour for `value` on the scale `[lo, hi]`, clamped to the ends.
pub fn value_to_color(value: f64, lo: f64, hi: f64) -> RGBColor {
    if !value.is_finite() || !lo.is_finite() || !hi.is_finite() {
        return RGBColor(0, 0, 0);
    }
    let span = (hi - lo).abs().max(1e-9);
    let t = ((value.clamp(lo.min(hi), lo.max(hi)) - lo.min(hi)) / span).clamp(0.0, 1.0);
    let c = colorous::VIRIDIS.eval_continuous(t);
    RGBColor(c.r, c.g, c.b)
}

/// Colour scale for a quantity: its display range, else the data range.
pub fn color_range(quantity: Quantity, data: Option<(f64, f64)>) -> (f64, f64) {
    if let Some(range) = quantity.display_range() {
        return range;
    }
    match data {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((lo, _)) => (lo - 0.5, lo + 0.5),
        None => (0.0, 1.0),
    }
}

fn ensure_parent(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", parent.display())))?;
        }
    }
    Ok(())
}

fn render_error(path: &Path, e: Box<dyn Error>) -> AppError {
    AppError::io(format!("Failed to render '{}': {e}", path.display()))
}

fn draw_heatmap(
    area: &DrawingArea<SVGBackend, Shift>,
    caption: &str,
    grid: &Grid,
    (lo, hi): (f64, f64),
) -> DrawResult {
    let width = grid.width().max(1) as f64;
    let height = grid.height().max(1) as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", FONT_LABEL))
        .margin(5)
        .x_label_area_size(25)
        .y_label_area_size(25)
        .build_cartesian_2d(0.0..width, 0.0..height)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(grid.width().min(16))
        .y_labels(grid.height().min(8))
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.0}"))
        .label_style(("sans-serif", FONT_LABEL))
        .draw()?;

    chart.draw_series(grid.filled().map(|(col, row, v)| {
        let (x, y) = (col as f64, row as f64);
        Rectangle::new([(x, y), (x + 1.0, y + 1.0)], value_to_color(v, lo, hi).filled())
    }))?;
    Ok(())
}

/// Heatmap of one single-chip grid.
pub fn render_grid(path: &Path, title: &str, grid: &Grid) -> Result<(), AppError> {
    ensure_parent(path)?;
    let range = color_range(grid.quantity(), grid.value_range());
    let size = (
        (grid.width() as u32 * GRID_CELL_PX).max(300) + 60,
        (grid.height() as u32 * GRID_CELL_PX).max(120) + 80,
    );

    let draw = || -> DrawResult {
        let root = SVGBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE)?;
        let caption = format!("{title} [{:.3}, {:.3}]", range.0, range.1);
        draw_heatmap(&root, &caption, grid, range)?;
        root.present()?;
        Ok(())
    };
    draw().map_err(|e| render_error(path, e))
}

/// 3×2 panel of single-chip grids; empty cells are labelled.
pub fn render_canvas(path: &Path, canvas: &CompositeCanvas) -> Result<(), AppError> {
    ensure_parent(path)?;

    let mut data: Option<(f64, f64)> = None;
    for (_, grid) in canvas.cells() {
        if let Some((lo, hi)) = grid.and_then(Grid::value_range) {
            data = Some(match data {
                Some((a, b)) => (a.min(lo), b.max(hi)),
                None => (lo, hi),
            });
        }
    }
    let range = color_range(canvas.quantity(), data);

    let draw = || -> DrawResult {
        let root = SVGBackend::new(path, CANVAS_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        root.draw(&Text::new(
            format!(
                "{} ({}) [{:.3}, {:.3}]",
                canvas.quantity().label(),
                canvas.phase(),
                range.0,
                range.1
            ),
            (10, 10),
            ("sans-serif", FONT_TITLE).into_font().color(&BLACK),
        ))?;

        let areas = root.margin(40, 5, 5, 5).split_evenly((CANVAS_ROWS, CANVAS_COLUMNS));
        for ((cell, grid), area) in canvas.cells().zip(areas.iter()) {
            match grid {
                Some(grid) => draw_heatmap(area, &format!("Cell {cell}"), grid, range)?,
                None => {
                    area.draw(&Text::new(
                        format!("Cell {cell}: no chip"),
                        (20, 20),
                        ("sans-serif", FONT_LABEL).into_font().color(&BLACK),
                    ))?;
                }
            }
        }
        root.present()?;
        Ok(())
    };
    draw().map_err(|e| render_error(path, e))
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        return None;
    }
    if hi == lo {
        return Some((lo - 0.5, hi + 0.5));
    }
    let pad = 0.05 * (hi - lo);
    Some((lo - pad, hi + pad))
}

/// Overlay of all series in `plot`, with the fitted Gaussian and its
/// statistics when a single fit is attached.
pub fn render_series(path: &Path, plot: &SeriesPlot<'_>) -> Result<(), AppError> {
    ensure_parent(path)?;

    let points = || plot.series.iter().flat_map(|s| s.points.iter());
    let Some(x_range) = bounds(points().map(|p| p.x)) else {
        return Err(AppError::invalid_input(format!(
            "Nothing to draw for '{}': no finite points.",
            path.display()
        )));
    };
    let y_range = bounds(points().map(|p| p.y)).unwrap_or((0.0, 1.0));

    let draw = || -> DrawResult {
        let root = SVGBackend::new(path, SERIES_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(plot.title, ("sans-serif", FONT_TITLE))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

        chart
            .configure_mesh()
            .x_desc(plot.axis_x)
            .light_line_style(WHITE.mix(0.7))
            .label_style(("sans-serif", FONT_LABEL))
            .draw()?;

        for (i, s) in plot.series.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(LineSeries::new(s.points.iter().map(|p| (p.x, p.y)), color.stroke_width(1)))?
                .label(s.name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        if let Some(fit) = &plot.fit {
            let params = [fit.constant, fit.mean, fit.sigma];
            let step = (x_range.1 - x_range.0) / FIT_SAMPLES as f64;
            chart
                .draw_series(LineSeries::new(
                    (0..=FIT_SAMPLES).map(|i| {
                        let x = x_range.0 + step * i as f64;
                        (x, predict(x, &params))
                    }),
                    BLUE.stroke_width(2),
                ))?
                .label("Gaussian fit")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

            let lines = [
                format!("Constant  {:.3} ± {:.3}", fit.constant, fit.constant_err),
                format!("Mean      {:.3} ± {:.3}", fit.mean, fit.mean_err),
                format!("Sigma     {:.3} ± {:.3}", fit.sigma, fit.sigma_err),
                format!("χ² / ndf  {:.2} / {}", fit.chi2, fit.ndf),
            ];
            for (i, line) in lines.iter().enumerate() {
                root.draw(&Text::new(
                    line.clone(),
                    (90, 60 + 18 * i as i32),
                    ("sans-serif", FONT_LABEL).into_font().color(&BLACK),
                ))?;
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", FONT_LABEL))
            .draw()?;

        root.present()?;
        Ok(())
    };
    draw().map_err(|e| render_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::PlotSeries;
    use crate::domain::{Phase, Point, SeriesGroup};

    #[test]
    fn colors_are_clamped_to_scale_ends() {
        assert_eq!(value_to_color(-10.0, 0.0, 5.0), value_to_color(0.0, 0.0, 5.0));
        assert_eq!(value_to_color(99.0, 0.0, 5.0), value_to_color(5.0, 0.0, 5.0));
        assert_ne!(value_to_color(1.0, 0.0, 5.0), value_to_color(4.0, 0.0, 5.0));
        assert_eq!(value_to_color(f64::NAN, 0.0, 5.0), RGBColor(0, 0, 0));
    }

    #[test]
    fn display_range_wins_over_data_range() {
        assert_eq!(color_range(Quantity::Mean, Some((1.0, 1000.0))), (0.0, 250.0));
        assert_eq!(color_range(Quantity::Constant, Some((1.0, 3.0))), (1.0, 3.0));
        assert_eq!(color_range(Quantity::Ndf, Some((4.0, 4.0))), (3.5, 4.5));
        assert_eq!(color_range(Quantity::ConstantErr, None), (0.0, 1.0));
    }

    #[test]
    fn writes_svg_files() {
        let dir = tempfile::tempdir().unwrap();

        let mut grid = Grid::new(Quantity::Sigma, 3, 2);
        grid.set(0.5, 0.5, 3.0);
        grid.set(2.5, 1.5, 30.0);
        let grid_path = dir.path().join("maps/scurve_sigma.svg");
        render_grid(&grid_path, "Sigma", &grid).unwrap();
        assert!(fs::read_to_string(&grid_path).unwrap().contains("<svg"));

        let mut canvas = CompositeCanvas::new(Quantity::Sigma, Phase::Pre);
        canvas.place(4, &grid);
        let canvas_path = dir.path().join("composite/composite_pre_sigma.svg");
        render_canvas(&canvas_path, &canvas).unwrap();
        assert!(canvas_path.exists());

        let points: Vec<Point> = (0..10).map(|i| Point::new(i as f64, (i * i) as f64)).collect();
        let plot = SeriesPlot {
            title: "S-curves",
            axis_x: "Threshold",
            series: vec![PlotSeries {
                name: "0",
                group: SeriesGroup::Measurements,
                points: &points,
            }],
            fit: None,
        };
        let series_path = dir.path().join("scurve.svg");
        render_series(&series_path, &plot).unwrap();
        assert!(series_path.exists());
    }
}
