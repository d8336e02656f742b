//! Media Minder - A movie and TV catalog builder.
//!
//! This application scans configured media directories, identifies each
//! video file from local hints and online metadata providers, and keeps a
//! SQLite catalog of movies, shows and episodes in sync with the disk.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod hints;
pub mod model;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log targets that follow `--log-level`; anything else stays at the
/// `RUST_LOG` default.
const LOG_TARGETS: [&str; 6] = ["media_minder", "catalog", "db", "enrichment", "events", "hints"];

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let level = args.log_level.to_string().to_lowercase();
    let mut filter = EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{target}={level}").parse()?);
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    cli::run_command(&args)
}
