//! Floorplan maps of fit quantities.
//!
//! - `quantity`: the eight tracked scalars and their display settings
//! - `grid`: one single-chip map per quantity, addressed by geometry coordinates
//! - `canvas`: 3×2 composite panels accumulating one chip per cell
//! - `compositor`: fills grids from fit results and places them on the composites

pub mod canvas;
pub mod compositor;
pub mod grid;
pub mod quantity;

pub use canvas::*;
pub use compositor::*;
pub use grid::*;
pub use quantity::*;
