//! Configuration file discovery and rendering.
//!
//! # Configuration File Format
//!
//! ```toml
//! [search]
//! default_page_size = 50
//! min_page_size = 1
//! max_page_size = 500
//! autocomplete_limit = 10
//!
//! [store]
//! backend = "sqlite"          # or "memory"
//! path = "~/.local/share/arxiv-search/abstracts.db"
//!
//! [logging]
//! level = "info"
//! format = "text"             # or "json"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// File name looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "arxiv-search.toml";

/// Directory under the user config dir
const CONFIG_DIR_NAME: &str = "arxiv-search";

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Refusing to overwrite existing file: {0}")]
    Exists(PathBuf),
}

/// First existing config file: `./arxiv-search.toml`, then
/// `<config dir>/arxiv-search/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
        .filter(|path| path.is_file())
}

/// Render a configuration as TOML
pub fn render_config(config: &Config) -> Result<String, ConfigFileError> {
    toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))
}

/// Write the default configuration to `path`, never overwriting
pub fn write_default_config(path: &Path) -> Result<(), ConfigFileError> {
    if path.exists() {
        return Err(ConfigFileError::Exists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
    }

    let content = render_config(&Config::default())?;
    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, StoreBackend};
    use tempfile::tempdir;

    #[test]
    fn test_render_round_trip() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.path = Some(PathBuf::from("abstracts.db"));

        let rendered = render_config(&config).unwrap();
        assert!(rendered.contains("backend = \"sqlite\""));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_write_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default_config(&path).unwrap();
        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.search.default_page_size, 50);

        assert!(matches!(
            write_default_config(&path),
            Err(ConfigFileError::Exists(_))
        ));
    }
}
