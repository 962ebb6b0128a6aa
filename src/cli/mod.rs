//! Command-line parsing for the S-curve floorplan tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! processing code; `app` turns these values into a run.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "scurve", version, about = "S-curve calibration processing and floorplan maps")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process scan files: fit, integrate, normalize and fill the floorplans.
    Run(RunArgs),
    /// Write synthetic scan files for the configured chips and phases.
    Simulate(SimulateArgs),
    /// Print the floorplan coordinate of element indices.
    Resolve(ResolveArgs),
}

/// Options shared by every command that reads a run configuration.
#[derive(Debug, Parser, Clone)]
pub struct ConfigArgs {
    /// Run configuration (YAML). Defaults apply when omitted.
    #[arg(short, long, value_name = "YAML")]
    pub config: Option<PathBuf>,

    /// Override the output directory.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Override the scan file pattern (`{chip}` and `{phase}` are substituted).
    #[arg(short, long, value_name = "PATTERN")]
    pub input: Option<String>,

    /// Also process every pixel on its own.
    #[arg(long)]
    pub per_pixel: bool,

    /// Skip SVG rendering; only the archive and CSV exports are written.
    #[arg(long)]
    pub no_render: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Random seed for threshold and noise generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of scan steps per pixel.
    #[arg(long, default_value_t = 256)]
    pub steps: usize,

    /// Mean pixel threshold.
    #[arg(long, default_value_t = 120.0)]
    pub threshold: f64,

    /// Peak height of the differential response.
    #[arg(long, default_value_t = 200.0)]
    pub hits: f64,
}

#[derive(Debug, Parser, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Element indices to resolve.
    #[arg(required = true)]
    pub indices: Vec<u32>,
}
