//! Scan curve processing.
//!
//! The [`CurveProcessor`] owns the series of one processing pass and derives
//! S-curves and Gaussian fit results from them.

pub mod processor;

pub use processor::*;
