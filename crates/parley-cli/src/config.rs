//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use parley_session::JsonFileStickyErrors;

/// Configuration for parley
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat server
    pub server_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Directory holding the sticky error ledger
    pub data_dir: Option<String>,
    /// How long failure notifications stay up, in milliseconds
    pub notification_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            token: None,
            data_dir: None,
            notification_ms: 5000,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PARLEY_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Create the config file with commented defaults if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// Token from `PARLEY_TOKEN`, then the config file
    pub fn token(&self) -> Option<String> {
        std::env::var("PARLEY_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.clone())
    }

    /// Directory for the sticky error ledger
    pub fn sticky_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(JsonFileStickyErrors::default_dir)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# parley configuration file
# Place at ~/.config/parley/config.toml (Linux/Mac) or %APPDATA%\parley\config.toml (Windows)

# Chat server base URL
server_url = "http://localhost:8000"

# Bearer token (optional - PARLEY_TOKEN takes precedence)
# token = "..."

# Where sticky conversation errors are kept (defaults to the local data dir)
# data_dir = "~/.local/share/parley"

# How long failure notifications stay up, in milliseconds (0 = until dismissed)
notification_ms = 5000
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "server_url = \"https://chat.example.com\"\n").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.server_url, "https://chat.example.com");
        assert_eq!(config.notification_ms, 5000);
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "server_url = [").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_sticky_dir_override() {
        let config = Config {
            data_dir: Some("/tmp/parley-data".into()),
            ..Config::default()
        };
        assert_eq!(config.sticky_dir(), PathBuf::from("/tmp/parley-data"));
    }
}
