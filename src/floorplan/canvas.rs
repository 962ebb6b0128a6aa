//! Composite canvas: one 3×2 panel per quantity and phase.
//!
//! Cells are numbered 1..=6 row-major from the top-left, so the top row holds
//! cells 1, 2, 3 and the bottom row 4, 5, 6.

use serde::{Deserialize, Serialize};

use crate::domain::Phase;
use crate::floorplan::{Grid, Quantity};

pub const CANVAS_COLUMNS: usize = 3;
pub const CANVAS_ROWS: usize = 2;
pub const CANVAS_CELLS: usize = CANVAS_COLUMNS * CANVAS_ROWS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeCanvas {
    quantity: Quantity,
    phase: Phase,
    cells: Vec<Option<Grid>>,
}

impl CompositeCanvas {
    pub fn new(quantity: Quantity, phase: Phase) -> Self {
        Self {
            quantity,
            phase,
            cells: vec![None; CANVAS_CELLS],
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn slot(cell: i32) -> Option<usize> {
        let cell = usize::try_from(cell).ok()?;
        (1..=CANVAS_CELLS).contains(&cell).then(|| cell - 1)
    }

    /// Copy `grid` into `cell` (1-based). Returns `false` for cells outside 1..=6.
    pub fn place(&mut self, cell: i32, grid: &Grid) -> bool {
        match Self::slot(cell) {
            Some(i) => {
                self.cells[i] = Some(grid.clone());
                true
            }
            None => false,
        }
    }

    pub fn cell(&self, cell: i32) -> Option<&Grid> {
        Self::slot(cell).and_then(|i| self.cells[i].as_ref())
    }

    /// Cells in drawing order, paired with their 1-based number.
    pub fn cells(&self) -> impl Iterator<Item = (i32, Option<&Grid>)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, g)| (i as i32 + 1, g.as_ref()))
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Artifact name, e.g. `composite_pre_mu`.
    pub fn artifact_name(&self) -> String {
        format!("composite_{}_{}", self.phase, self.quantity.name())
    }
}
