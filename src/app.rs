//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads the run configuration (YAML, `.env`, CLI overrides)
//! - dispatches to the run, simulate and resolve commands

use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Command, ConfigArgs, ResolveArgs, RunArgs, SimulateArgs};
use crate::config::RunConfig;
use crate::data::{ScanProfile, write_simulated_run};
use crate::error::AppError;
use crate::geometry::GeometryMap;

pub mod session;

pub use session::Session;

/// Entry point for the `scurve` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Resolve(args) => handle_resolve(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .try_init()
        .ok();
}

/// Resolve the run configuration: file (or defaults), then environment, then CLI.
pub fn load_config(args: &ConfigArgs) -> Result<RunConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml(path)?,
        None => RunConfig::default(),
    };
    config.apply_env();
    if let Some(dir) = &args.output {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let mut config = load_config(&args.config)?;
    if let Some(input) = args.input {
        config.input = input;
    }
    config.per_pixel |= args.per_pixel;
    config.render &= !args.no_render;

    println!("{}", crate::report::format_run_header(&config));

    let mut session = Session::new(config)?;
    let summaries = session.run()?;

    println!("{}", crate::report::format_summary_table(&summaries));
    info!("{} artifacts written", session.writer().written());
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = load_config(&args.config)?;
    let profile = ScanProfile {
        steps: args.steps,
        threshold_mean: args.threshold,
        hits: args.hits,
        seed: args.seed,
        ..ScanProfile::default()
    };

    let written = write_simulated_run(&config, &profile)?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

fn handle_resolve(args: ResolveArgs) -> Result<(), AppError> {
    let config = load_config(&args.config)?;
    let geometry = GeometryMap::new(config.geometry)?;

    let mut first_unmapped = None;
    for &index in &args.indices {
        match geometry.resolve(index) {
            Some((x, y)) => println!("{index}: ({x}, {y})"),
            None => {
                println!("{index}: not in geometry");
                first_unmapped.get_or_insert(index);
            }
        }
    }

    match first_unmapped {
        Some(index) => Err(AppError::unmapped_element(Some(index))),
        None => Ok(()),
    }
}
