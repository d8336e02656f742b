//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `scan`: Catalog runs over the configured sources
//! - `catalog`: Listing and watched toggles
//! - `sources`: Source directory management

mod catalog;
mod scan;
mod sources;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::level_filters::LevelFilter;

use crate::config::{self, Config};
use crate::db;
use crate::model::MediaClass;

pub use catalog::{cmd_list, cmd_set_watched};
pub use scan::cmd_scan;
pub use sources::{cmd_add_source, cmd_sources};

/// Media Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: OS config directory)
    #[arg(long, global = true, env = "MEDIA_MINDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog database file (overrides the config)
    #[arg(long, global = true, env = "MEDIA_MINDER_DB")]
    pub database: Option<PathBuf>,

    /// Lookups per batch (overrides the config)
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// CRITICAL, ERROR, WARNING, INFO or DEBUG
    #[arg(long, global = true, default_value = "INFO", value_parser = parse_log_level)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Catalog every configured source (the default)
    Scan,
    /// List movies and shows in the catalog
    List,
    /// Mark the entry owning a file as watched
    Watch {
        /// Path to a catalogued file
        path: PathBuf,
    },
    /// Mark the entry owning a file as not watched
    Unwatch {
        /// Path to a catalogued file
        path: PathBuf,
    },
    /// Add a source directory to the config
    AddSource {
        /// Directory holding the media
        path: PathBuf,
        /// What the directory holds
        #[arg(long, value_enum)]
        class: MediaClass,
    },
    /// List configured source directories
    Sources,
}

/// Map a `--log-level` name onto a tracing level. Case-insensitive.
pub fn parse_log_level(name: &str) -> Result<LevelFilter, String> {
    match name.to_ascii_uppercase().as_str() {
        "CRITICAL" | "ERROR" => Ok(LevelFilter::ERROR),
        "WARNING" | "WARN" => Ok(LevelFilter::WARN),
        "INFO" => Ok(LevelFilter::INFO),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "TRACE" => Ok(LevelFilter::TRACE),
        _ => Err(format!(
            "unknown log level {name:?}, expected CRITICAL, ERROR, WARNING, INFO or DEBUG"
        )),
    }
}

/// Run the specified CLI command. No command runs a catalog pass.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let config_path = cli.config.clone().or_else(config::config_path);
    let config = load_config(cli, config_path.as_deref());

    match &cli.command {
        None | Some(Commands::Scan) => cmd_scan(&rt, &config),
        Some(Commands::List) => cmd_list(&rt, &config),
        Some(Commands::Watch { path }) => cmd_set_watched(&rt, &config, path, true),
        Some(Commands::Unwatch { path }) => cmd_set_watched(&rt, &config, path, false),
        Some(Commands::AddSource { path, class }) => {
            let config_path = config_path.context("Could not determine config directory")?;
            cmd_add_source(&config_path, path, *class)
        }
        Some(Commands::Sources) => cmd_sources(&config),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Load the config and apply command-line overrides.
fn load_config(cli: &Cli, path: Option<&std::path::Path>) -> Config {
    let mut config = match path {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    if let Some(database) = &cli.database {
        config.library.database = Some(database.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.processor.concurrency = concurrency;
    }
    config
}

/// Open (creating and migrating if needed) the configured catalog.
pub(crate) async fn open_catalog(config: &Config) -> anyhow::Result<SqlitePool> {
    let path = config.database_path();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    db::init_db(&db::db_url(Some(&path)))
        .await
        .with_context(|| format!("Failed to open catalog {}", path.display()))
}
