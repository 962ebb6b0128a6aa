//! Mathematical utilities: cumulative integration and least squares.

pub mod integrate;
pub mod ols;

pub use integrate::*;
pub use ols::*;
