//! Single-chip map of one quantity.
//!
//! The grid spans `[0, width) × [0, height)` in geometry coordinates, one unit
//! per cell, with the origin in the bottom-left corner. Values are stored as
//! given; display clamping happens only at render time.

use serde::{Deserialize, Serialize};

use crate::floorplan::Quantity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    quantity: Quantity,
    width: usize,
    height: usize,
    // row-major, row 0 at the bottom; `None` marks cells never filled
    cells: Vec<Option<f64>>,
}

impl Grid {
    pub fn new(quantity: Quantity, width: usize, height: usize) -> Self {
        Self {
            quantity,
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn offset(&self, x: f64, y: f64) -> Option<usize> {
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let col = x.floor() as usize;
        let row = y.floor() as usize;
        (col < self.width && row < self.height).then_some(row * self.width + col)
    }

    /// Write `value` into the cell containing `(x, y)`, replacing any previous value.
    ///
    /// Returns `false` if the coordinate lies outside the grid.
    pub fn set(&mut self, x: f64, y: f64, value: f64) -> bool {
        match self.offset(x, y) {
            Some(i) => {
                self.cells[i] = Some(value);
                true
            }
            None => false,
        }
    }

    /// Value of the cell containing `(x, y)`.
    pub fn get(&self, x: f64, y: f64) -> Option<f64> {
        self.offset(x, y).and_then(|i| self.cells[i])
    }

    /// Filled cells as `(column, row from bottom, value)`.
    pub fn filled(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i % self.width, i / self.width, v)))
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|v| v.is_some()).count()
    }

    /// Minimum and maximum of the finite filled values.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for (_, _, v) in self.filled() {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        (lo <= hi).then_some((lo, hi))
    }
}
