//! Synthetic input data.

pub mod simulate;

pub use simulate::*;
