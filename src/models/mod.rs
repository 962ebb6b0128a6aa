//! Model functions fitted to scan curves.
//!
//! Models are implemented as small, pure functions so that the fitter can stay
//! generic over the parameter vector.

pub mod gaussian;

pub use gaussian::*;
