//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\media-minder\config.toml
//! - macOS: ~/Library/Application Support/media-minder/config.toml
//! - Linux: ~/.config/media-minder/config.toml
//!
//! The config file is human-readable and editable. Every section has
//! defaults, so a file only needs the settings it changes:
//!
//! ```toml
//! [library]
//! sources = [
//!     { path = "/media/movies", class = "movie" },
//!     { path = "/media/tv", class = "show" },
//! ]
//!
//! [providers]
//! omdb_api_key = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::enrichment::EnrichmentConfig;
use crate::model::SourceRoot;
use crate::scanner::DEFAULT_VIDEO_TYPES;

/// Default number of lookups run concurrently per batch.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source directories and catalog location
    pub library: LibraryConfig,

    /// Scan and batch settings
    pub processor: ProcessorConfig,

    /// Metadata provider endpoints and limits
    pub providers: ProvidersConfig,
}

/// Library settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Configured media directories
    pub sources: Vec<SourceRoot>,

    /// Catalog database file (default: data dir)
    pub database: Option<PathBuf>,
}

/// Processor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Lookups per batch
    pub concurrency: usize,

    /// File extensions considered video, without the dot
    pub video_types: Vec<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            video_types: DEFAULT_VIDEO_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub omdb_url: String,

    /// OMDb API key, sent as `apikey` when set
    pub omdb_api_key: Option<String>,

    pub imdb_find_url: String,

    pub kitsu_url: String,

    pub user_agent: String,

    /// Concurrent requests per host unless overridden below
    pub default_host_limit: usize,

    /// Per-host overrides, keyed by host name
    pub host_limits: HashMap<String, usize>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        let defaults = EnrichmentConfig::default();
        Self {
            omdb_url: defaults.omdb_url,
            omdb_api_key: defaults.omdb_api_key,
            imdb_find_url: defaults.imdb_find_url,
            kitsu_url: defaults.kitsu_url,
            user_agent: defaults.user_agent,
            default_host_limit: defaults.default_host_limit,
            host_limits: defaults.host_limits,
        }
    }
}

impl ProvidersConfig {
    /// Settings for the enrichment service.
    pub fn to_enrichment(&self) -> EnrichmentConfig {
        EnrichmentConfig {
            omdb_url: self.omdb_url.clone(),
            omdb_api_key: self.omdb_api_key.clone().filter(|k| !k.is_empty()),
            imdb_find_url: self.imdb_find_url.clone(),
            kitsu_url: self.kitsu_url.clone(),
            default_host_limit: self.default_host_limit,
            host_limits: self.host_limits.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl Config {
    /// Catalog database path: configured, else under the data directory,
    /// else the working directory.
    pub fn database_path(&self) -> PathBuf {
        self.library
            .database
            .clone()
            .or_else(|| data_dir().map(|d| d.join(crate::db::DEFAULT_DB_NAME)))
            .unwrap_or_else(|| PathBuf::from(crate::db::DEFAULT_DB_NAME))
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("media-minder"))
}

/// Get the data directory path (catalog database lives here)
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("media-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location.
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::warn!("Could not determine config directory, using defaults");
            Config::default()
        }
    }
}

/// Load configuration from an explicit file, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to `path`.
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
