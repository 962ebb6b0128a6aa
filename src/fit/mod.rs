//! Gaussian fitting of scan curves.
//!
//! Responsibilities:
//!
//! - define the fit-routine seam (`GaussianFitter`) used by the curve processor
//! - provide the default Levenberg–Marquardt implementation
//! - generate sigma seed grids for the multi-start search (parallel)

pub mod fitter;
pub mod seeds;

pub use fitter::*;
pub use seeds::*;
