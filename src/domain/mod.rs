//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - scan data (`Point`, `RawSeries`, `DerivedSeries`)
//! - fit outputs (`GaussianFit`, `FitResult`)
//! - run selectors (`Phase`, `SeriesGroup`)

pub mod types;

pub use types::*;
