//! Command-line interface for media-minder.
//!
//! This module provides CLI commands for cataloging the configured sources,
//! listing the catalog, toggling watched state, and managing sources.

mod commands;

pub use commands::{Cli, Commands, run_command};
