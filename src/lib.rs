//! `scurve-floorplan` library crate.
//!
//! The binary (`scurve`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the curve processor and floorplan compositor can be driven by other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod curve;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod floorplan;
pub mod geometry;
pub mod io;
pub mod math;
pub mod models;
pub mod render;
pub mod report;
