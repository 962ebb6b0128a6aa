//! Archive + SVG writer used by the `scurve` binary.
//!
//! Archives are opened for update on first use and kept in memory. Saves
//! store the artifact under `directory/name`; [`ArtifactWriter::flush`] writes
//! every changed archive once. With rendering enabled an SVG is drawn next to
//! it, at `<directory>/<name>.svg` on the filesystem, as soon as it is saved.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;

use log::debug;

use crate::curve::{SeriesPlot, SeriesSink};
use crate::domain::FitResult;
use crate::error::AppError;
use crate::floorplan::{CompositeCanvas, FloorplanSink, Grid};
use crate::io::archive::{Archive, ArchivedSeries, Artifact};
use crate::io::OutputTarget;
use crate::render;

#[derive(Debug, Default)]
pub struct ArtifactWriter {
    render: bool,
    archives: HashMap<PathBuf, OpenArchive>,
    // Number of artifacts stored per archive path.
    written: HashMap<PathBuf, usize>,
    archive_writes: usize,
}

#[derive(Debug)]
struct OpenArchive {
    archive: Archive,
    dirty: bool,
}

impl ArtifactWriter {
    pub fn new(render: bool) -> Self {
        Self {
            render,
            ..Self::default()
        }
    }

    pub fn renders(&self) -> bool {
        self.render
    }

    /// Total artifacts stored through this writer.
    pub fn written(&self) -> usize {
        self.written.values().sum()
    }

    /// Number of times an archive file has been written.
    pub fn archive_writes(&self) -> usize {
        self.archive_writes
    }

    /// Write every archive changed since the last flush.
    pub fn flush(&mut self) -> Result<(), AppError> {
        for open in self.archives.values_mut().filter(|o| o.dirty) {
            open.archive.write()?;
            open.dirty = false;
            self.archive_writes += 1;
            debug!("Wrote archive '{}'", open.archive.path().display());
        }
        Ok(())
    }

    fn store(&mut self, target: &OutputTarget, name: &str, artifact: Artifact) -> Result<(), AppError> {
        let open = match self.archives.entry(target.archive().to_path_buf()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(OpenArchive {
                archive: Archive::open_for_update(target.archive())?,
                dirty: false,
            }),
        };
        open.archive.put(target.directory(), name, artifact);
        open.dirty = true;
        *self.written.entry(target.archive().to_path_buf()).or_default() += 1;
        debug!(
            "Stored '{}/{}' in '{}'",
            target.directory(),
            name,
            target.archive().display()
        );
        Ok(())
    }

    /// Store the fit results of one chip/phase step.
    pub fn save_fits(&mut self, target: &OutputTarget, name: &str, fits: &[FitResult]) -> Result<(), AppError> {
        self.store(target, name, Artifact::Fits { fits: fits.to_vec() })
    }
}

impl SeriesSink for ArtifactWriter {
    fn save_series(&mut self, target: &OutputTarget, plot: &SeriesPlot<'_>) -> Result<(), AppError> {
        let series = plot
            .series
            .iter()
            .map(|s| ArchivedSeries {
                name: s.name.to_string(),
                group: s.group,
                points: s.points.to_vec(),
            })
            .collect();
        self.store(
            target,
            target.name(),
            Artifact::Series {
                title: plot.title.to_string(),
                series,
                fit: plot.fit,
            },
        )?;

        if self.render {
            render::render_series(&target.render_path(target.name(), "svg"), plot)?;
        }
        Ok(())
    }
}

impl FloorplanSink for ArtifactWriter {
    fn save_grid(&mut self, target: &OutputTarget, name: &str, grid: &Grid) -> Result<(), AppError> {
        self.store(target, name, Artifact::Grid { grid: grid.clone() })?;
        if self.render {
            render::render_grid(&target.render_path(name, "svg"), grid.quantity().label(), grid)?;
        }
        Ok(())
    }

    fn save_canvas(&mut self, target: &OutputTarget, canvas: &CompositeCanvas) -> Result<(), AppError> {
        let name = canvas.artifact_name();
        self.store(target, &name, Artifact::Canvas { canvas: canvas.clone() })?;
        if self.render {
            render::render_canvas(&target.render_path(&name, "svg"), canvas)?;
        }
        Ok(())
    }
}
