//! Run orchestration: chips × phases through the curve processor and the
//! floorplan compositor.
//!
//! For every chip (in configured order) and phase:
//! - load the chip's scan file and pick the requested pixels
//! - optionally process each pixel alone (fit statistics shown on its chart)
//! - fit all pixels, save the raw scans (`scurve_diff`)
//! - integrate + normalize, save the S-curves (`scurve`)
//! - export the fits and fill the floorplan
//!
//! The position of a chip in the configured list is its logical position on
//! the assembly. Composite canvases are saved by the last fill of the run.
//! The archive is written once at the end of every step.

use log::{info, warn};

use crate::config::RunConfig;
use crate::curve::CurveProcessor;
use crate::domain::{Phase, RawSeries, SeriesGroup};
use crate::error::AppError;
use crate::fit::LevenbergMarquardt;
use crate::floorplan::FloorplanCompositor;
use crate::geometry::GeometryMap;
use crate::io::{ArtifactWriter, CsvSeriesSource, OutputTarget, SeriesSource, write_fits_csv};
use crate::report::{ChipSummary, summarize};

const MEASUREMENTS: &[SeriesGroup] = &[SeriesGroup::Measurements];
const SCURVES: &[SeriesGroup] = &[SeriesGroup::Scurves];

pub struct Session {
    config: RunConfig,
    geometry: GeometryMap,
    fitter: LevenbergMarquardt,
    processor: CurveProcessor,
    compositor: FloorplanCompositor,
    writer: ArtifactWriter,
}

impl Session {
    pub fn new(config: RunConfig) -> Result<Self, AppError> {
        if config.chips.is_empty() {
            return Err(AppError::configuration("No chips configured."));
        }
        if config.phases.is_empty() {
            return Err(AppError::configuration("No phases configured."));
        }

        let geometry = GeometryMap::new(config.geometry.clone())?;
        let archive = config.archive_path();

        let mut processor = CurveProcessor::new(OutputTarget::new(&archive, "", "scurve"));
        processor.set_axis_title(config.axis_title.clone());

        let mut compositor = FloorplanCompositor::new(OutputTarget::new(&archive, "", "scurve"));
        compositor.set_composite_target(OutputTarget::new(&archive, &config.composite_directory(), ""));

        Ok(Self {
            fitter: LevenbergMarquardt::new(config.fit.clone()),
            writer: ArtifactWriter::new(config.render),
            geometry,
            processor,
            compositor,
            config,
        })
    }

    pub fn compositor(&self) -> &FloorplanCompositor {
        &self.compositor
    }

    pub fn processor(&self) -> &CurveProcessor {
        &self.processor
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    /// Process every chip and phase; one summary per step.
    pub fn run(&mut self) -> Result<Vec<ChipSummary>, AppError> {
        let chips = self.config.chips.clone();
        let phases = self.config.phases.clone();
        let steps = chips.len() * phases.len();

        let mut summaries = Vec::with_capacity(steps);
        for (position, &chip) in chips.iter().enumerate() {
            for &phase in &phases {
                let is_final = summaries.len() + 1 == steps;
                let position = i32::try_from(position).unwrap_or(i32::MAX);
                // Artifacts saved before a failure are still written out.
                let step = self.process(position, chip, phase, is_final);
                let flushed = self.writer.flush();
                summaries.push(step?);
                flushed?;
            }
        }
        info!("Processed {} chip/phase steps", summaries.len());
        Ok(summaries)
    }

    /// Requested pixels inside the chip, or every element of the scan file.
    fn pixels(&self, source: &CsvSeriesSource) -> Vec<u32> {
        let requested: Vec<u32> = match &self.config.pixels {
            Some(p) => p.clone(),
            None => source.elements().collect(),
        };
        let (kept, dropped) = self.config.filter_pixels(&requested);
        if !dropped.is_empty() {
            warn!(
                "Ignoring pixels outside 0..{}: {:?}",
                self.config.pixels_per_chip, dropped
            );
        }
        kept
    }

    fn load(&self, source: &CsvSeriesSource, pixels: &[u32]) -> Result<(Vec<RawSeries>, Vec<u32>), AppError> {
        let mut series = Vec::with_capacity(pixels.len());
        let mut numbering = Vec::with_capacity(pixels.len());
        for &pixel in pixels {
            match source.load(pixel)? {
                Some(s) => {
                    series.push(s);
                    numbering.push(pixel);
                }
                None => warn!("No scan for pixel {pixel} in '{}'", source.path().display()),
            }
        }
        Ok((series, numbering))
    }

    fn process(&mut self, position: i32, chip: u32, phase: Phase, is_final: bool) -> Result<ChipSummary, AppError> {
        info!("Processing chip {chip} {phase}");

        let source = CsvSeriesSource::open(&self.config.input_path(chip, phase))?;
        let pixels = self.pixels(&source);
        let (series, numbering) = self.load(&source, &pixels)?;
        if series.is_empty() {
            return Err(AppError::configuration(format!(
                "No pixel scans to process for chip {chip} {phase} in '{}'.",
                source.path().display()
            )));
        }

        let directory = self.config.chip_directory(chip, phase);
        self.processor.target_mut().set_directory(&directory);

        if self.config.per_pixel {
            for (s, &pixel) in series.iter().zip(&numbering) {
                self.process_pixel(chip, phase, s.clone(), pixel)?;
            }
        }

        let title = format!("Chip {chip} {phase}");
        self.processor.reset();
        self.processor.set_title(title);
        self.processor.fill_graphs(series);
        self.processor.fill_numbering(numbering);

        self.processor.fit_gaussian(MEASUREMENTS, &self.fitter)?;
        self.processor.target_mut().set_name("scurve_diff");
        self.processor.save(MEASUREMENTS, &mut self.writer)?;

        self.processor.integrate_graphs(MEASUREMENTS)?;
        self.processor.normalize();
        self.processor.target_mut().set_name("scurve");
        self.processor.save(SCURVES, &mut self.writer)?;

        let fits = self.processor.fits().to_vec();
        let fits_target = self.processor.target().with_name("fits");
        write_fits_csv(&fits_target.render_path("fits", "csv"), chip, phase, &fits)?;
        self.writer.save_fits(&fits_target, "fits", &fits)?;

        self.compositor.target_mut().set_directory(&directory);
        self.compositor.configure(self.geometry.clone(), phase);
        self.compositor.fill(&fits, position, is_final, &mut self.writer)?;

        Ok(summarize(chip, phase, &fits))
    }

    fn process_pixel(&mut self, chip: u32, phase: Phase, series: RawSeries, pixel: u32) -> Result<(), AppError> {
        self.processor.reset();
        self.processor.set_title(format!("Chip {chip} {phase} pixel {pixel}"));
        self.processor.fill_graphs([series]);
        self.processor.fill_numbering(vec![pixel]);

        self.processor.fit_gaussian(MEASUREMENTS, &self.fitter)?;
        self.processor.target_mut().set_name(&format!("pixel_{pixel}_diff"));
        self.processor.save(MEASUREMENTS, &mut self.writer)?;

        self.processor.integrate_graphs(MEASUREMENTS)?;
        self.processor.normalize();
        self.processor.target_mut().set_name(&format!("pixel_{pixel}"));
        self.processor.save(SCURVES, &mut self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_chip_list_is_rejected() {
        let config = RunConfig {
            chips: vec![],
            ..RunConfig::default()
        };
        assert_eq!(Session::new(config).err().map(|e| e.kind()), Some(ErrorKind::Configuration));
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let config = RunConfig {
            geometry: vec![vec![1, 1]],
            ..RunConfig::default()
        };
        assert_eq!(Session::new(config).err().map(|e| e.kind()), Some(ErrorKind::Configuration));
    }

    #[test]
    fn missing_scan_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            input: dir.path().join("missing_{chip}_{phase}.csv").to_string_lossy().into_owned(),
            output_dir: dir.path().join("out"),
            render: false,
            ..RunConfig::default()
        };
        let mut session = Session::new(config).unwrap();
        assert_eq!(session.run().unwrap_err().kind(), ErrorKind::Io);
    }
}
