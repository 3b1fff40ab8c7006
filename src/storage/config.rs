//! Configuration handling for datasaver
//!
//! Configuration is stored in `~/.config/datasaver/config.toml` (or the
//! platform equivalent). The `DATASAVER_ROOT` environment variable overrides
//! the configured storage root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SavePolicy;

/// Environment variable overriding the storage root
pub const ROOT_ENV: &str = "DATASAVER_ROOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Directory holding persisted values (defaults to the platform data dir)
    pub root: Option<PathBuf>,

    /// Policy used when a caller does not pick one
    pub default_policy: SavePolicy,
}

impl Config {
    /// Loads configuration from the default location
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads configuration from a specific file; a missing file yields defaults
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse(&content).context("Failed to parse config")
    }

    /// Parses configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(root) = &config.root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("root must not be empty".to_string()));
            }
        }

        Ok(config)
    }

    /// Returns the config directory
    pub fn config_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns the path of the config file
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns the platform default storage root
    pub fn default_root() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_dir().join("values"))
    }

    /// Resolves the storage root: environment, then config, then platform default
    pub fn storage_root(&self) -> Result<PathBuf> {
        if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(root));
        }

        self.root
            .clone()
            .or_else(Self::default_root)
            .ok_or_else(|| anyhow::anyhow!("Could not determine a storage root; set {} or `root` in config", ROOT_ENV))
    }

    /// Saves the configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "datasaver", "datasaver")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.root, None);
        assert_eq!(config.default_policy, SavePolicy::Immediate);
    }

    #[test]
    fn parse_config() {
        let toml = r#"
root = "/tmp/values"
default_policy = "on_dispose"
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/tmp/values")));
        assert_eq!(config.default_policy, SavePolicy::OnDispose);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            Config::parse("default_policy = \"sometimes\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::parse("root = \"\""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_path(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let config = Config {
            root: Some(dir.path().join("values")),
            default_policy: SavePolicy::OnDispose,
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::from_path(&path).unwrap(), config);
    }
}
