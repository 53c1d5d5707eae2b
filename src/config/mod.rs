//! Configuration management.
//!
//! Settings come from, lowest precedence first: built-in defaults, a TOML file,
//! then `ARXIV_SEARCH_*` environment variables (`ARXIV_SEARCH_STORE__BACKEND=sqlite`).

mod file_config;

pub use file_config::{find_config_file, render_config, write_default_config, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::PageLimits;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ARXIV_SEARCH";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Paging and autocomplete settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Storage backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Page size when a request gives none
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Smallest accepted page size
    #[serde(default = "default_min_page_size")]
    pub min_page_size: usize,

    /// Largest accepted page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Suggestions returned by autocomplete when no limit is given
    #[serde(default = "default_autocomplete_limit")]
    pub autocomplete_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            min_page_size: default_min_page_size(),
            max_page_size: default_max_page_size(),
            autocomplete_limit: default_autocomplete_limit(),
        }
    }
}

impl SearchConfig {
    /// Page limits, repaired so that `min <= default <= max`
    pub fn page_limits(&self) -> PageLimits {
        let min_per_page = self.min_page_size.max(1);
        let max_per_page = self.max_page_size.max(min_per_page);
        PageLimits {
            default_per_page: self.default_page_size.clamp(min_per_page, max_per_page),
            min_per_page,
            max_per_page,
        }
    }
}

fn default_page_size() -> usize {
    50
}

fn default_min_page_size() -> usize {
    1
}

fn default_max_page_size() -> usize {
    500
}

fn default_autocomplete_limit() -> usize {
    10
}

/// Which store implementation to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In memory, optionally seeded from a JSON-lines file
    #[default]
    Memory,
    /// SQLite database file (in memory when no path is set)
    Sqlite,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// JSON-lines snapshot for `memory`, database file for `sqlite`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Load configuration from `path`, or the first discovered file, or defaults
pub fn get_config(path: Option<&Path>) -> Result<(Config, Option<PathBuf>), config::ConfigError> {
    let path = path.map(Path::to_path_buf).or_else(find_config_file);
    let config = load_config(path.as_deref())?;
    Ok((config, path))
}
