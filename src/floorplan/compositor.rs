//! Floorplan compositor.
//!
//! One compositor lives for a whole run. For every chip/phase step the
//! orchestrator calls [`FloorplanCompositor::configure`] and then
//! [`FloorplanCompositor::fill`]:
//!
//! 1. every fit result is resolved against the bound geometry and written into
//!    the eight single-chip grids
//! 2. the grids are handed to the sink and copied into the phase's composite
//!    canvases at the chip's physical panel cell
//! 3. on the final chip both phases' composites are handed to the sink once
//!
//! Persistence and rendering happen behind [`FloorplanSink`].

use log::{debug, info, warn};

use crate::domain::{FitResult, Phase};
use crate::error::AppError;
use crate::floorplan::{CompositeCanvas, Grid, Quantity};
use crate::geometry::{GeometryMap, INVALID_PANEL_CELL, physical_panel_cell};
use crate::io::OutputTarget;

/// Directory (inside the archive and on disk) receiving the composite canvases.
pub const COMPOSITE_DIRECTORY: &str = "composite";

/// Destination of filled grids and composite canvases.
pub trait FloorplanSink {
    fn save_grid(&mut self, target: &OutputTarget, name: &str, grid: &Grid) -> Result<(), AppError>;
    fn save_canvas(&mut self, target: &OutputTarget, canvas: &CompositeCanvas) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct FloorplanCompositor {
    target: OutputTarget,
    composite_target: OutputTarget,
    geometry: Option<GeometryMap>,
    phase: Phase,
    grids: Vec<Grid>,
    pre: Vec<CompositeCanvas>,
    post: Vec<CompositeCanvas>,
}

impl FloorplanCompositor {
    pub fn new(target: OutputTarget) -> Self {
        let mut composite_target = target.clone();
        composite_target.set_directory(COMPOSITE_DIRECTORY);
        composite_target.set_name("");

        Self {
            target,
            composite_target,
            geometry: None,
            phase: Phase::Pre,
            grids: Vec::new(),
            pre: Quantity::ALL.iter().map(|&q| CompositeCanvas::new(q, Phase::Pre)).collect(),
            post: Quantity::ALL.iter().map(|&q| CompositeCanvas::new(q, Phase::Post)).collect(),
        }
    }

    /// Bind a geometry and allocate fresh grids; later placements go to `phase`.
    pub fn configure(&mut self, geometry: GeometryMap, phase: Phase) {
        self.grids = Quantity::ALL
            .iter()
            .map(|&q| Grid::new(q, geometry.width(), geometry.height()))
            .collect();
        debug!(
            "Configured floorplan {}x{} for phase {phase}",
            geometry.width(),
            geometry.height()
        );
        self.geometry = Some(geometry);
        self.phase = phase;
    }

    /// Replace the layout, keeping the current phase.
    pub fn set_geometry(&mut self, rows: Vec<Vec<u32>>) -> Result<(), AppError> {
        let geometry = GeometryMap::new(rows)?;
        self.configure(geometry, self.phase);
        Ok(())
    }

    pub fn geometry(&self) -> Option<&GeometryMap> {
        self.geometry.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut OutputTarget {
        &mut self.target
    }

    pub fn composite_target(&self) -> &OutputTarget {
        &self.composite_target
    }

    pub fn set_composite_target(&mut self, target: OutputTarget) {
        self.composite_target = target;
    }

    pub fn grid(&self, quantity: Quantity) -> Option<&Grid> {
        self.grids.iter().find(|g| g.quantity() == quantity)
    }

    pub fn canvas(&self, phase: Phase, quantity: Quantity) -> Option<&CompositeCanvas> {
        let canvases = match phase {
            Phase::Pre => &self.pre,
            Phase::Post => &self.post,
        };
        canvases.iter().find(|c| c.quantity() == quantity)
    }

    /// Fill the grids from `fits`, persist them and place them on the composites.
    ///
    /// Every mappable result is written even when some are not; the first
    /// unmapped element is then returned as [`AppError::unmapped_element`] and
    /// nothing is persisted for this chip.
    pub fn fill(
        &mut self,
        fits: &[FitResult],
        logical_position: i32,
        is_final_chip: bool,
        sink: &mut dyn FloorplanSink,
    ) -> Result<(), AppError> {
        let geometry = self
            .geometry
            .as_ref()
            .ok_or_else(|| AppError::configuration("Geometry is not set: configure the floorplan before filling it."))?;

        let mut unmapped = Vec::new();
        for result in fits {
            let (Some(index), Some(fit)) = (result.index(), result.fit()) else {
                unmapped.push(AppError::unmapped_element(result.index()));
                continue;
            };
            let Some((x, y)) = geometry.resolve(index) else {
                unmapped.push(AppError::unmapped_element(Some(index)));
                continue;
            };
            for grid in &mut self.grids {
                grid.set(x, y, grid.quantity().value(fit));
            }
        }

        if let Some(first) = unmapped.first() {
            for err in &unmapped {
                warn!("{err}");
            }
            return Err(first.clone());
        }

        let base = self.target.name().to_string();
        for grid in &self.grids {
            let name = format!("{base}_{}", grid.quantity().name());
            sink.save_grid(&self.target, &name, grid)?;
        }

        let cell = physical_panel_cell(logical_position);
        if cell == INVALID_PANEL_CELL {
            warn!("Chip position {logical_position} has no panel cell; composite placement skipped.");
        } else {
            let canvases = match self.phase {
                Phase::Pre => &mut self.pre,
                Phase::Post => &mut self.post,
            };
            for (canvas, grid) in canvases.iter_mut().zip(&self.grids) {
                canvas.place(cell, grid);
            }
            debug!("Placed chip position {logical_position} in panel cell {cell} ({})", self.phase);
        }

        if is_final_chip {
            info!("Saving composite floorplans to '{}'", self.composite_target.directory());
            for canvas in self.pre.iter().chain(&self.post) {
                sink.save_canvas(&self.composite_target, canvas)?;
            }
        }

        Ok(())
    }
}
