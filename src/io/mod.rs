//! Input/output helpers.
//!
//! - output locations (`target`)
//! - raw scan CSV ingest and writing (`series`)
//! - JSON analysis archive (`archive`)
//! - archive + SVG writer implementing the persistence sinks (`writer`)
//! - fit result exports (`export`)

pub mod archive;
pub mod export;
pub mod series;
pub mod target;
pub mod writer;

pub use archive::*;
pub use export::*;
pub use series::*;
pub use target::*;
pub use writer::*;
