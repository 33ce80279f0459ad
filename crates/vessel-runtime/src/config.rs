//! Host configuration.
//!
//! The plugin core itself takes no configuration — candidates are handed to
//! the service explicitly. What the *host* needs is small: the version it
//! advertises to `serverVersion` checks, and logging settings. Values come
//! from a `vessel.toml` (working directory first, then the user config
//! directory) with `VESSEL_`-prefixed environment overrides on top.

use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use semver::Version;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while loading the host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration could not be read or deserialized.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] figment::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Host-level settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Default log filter directive (overridden by `RUST_LOG`).
    pub log_level: String,
    /// Optional log file path.
    pub log_file: Option<PathBuf>,
    /// Version the host advertises to plugin `serverVersion` range checks.
    pub server_version: Version,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            server_version: Version::new(1, 0, 0),
        }
    }
}

impl HostConfig {
    const FILE_NAME: &'static str = "vessel.toml";

    /// Loads configuration from the first `vessel.toml` on the search path,
    /// falling back to defaults when none exists. Environment variables
    /// prefixed `VESSEL_` override file values either way.
    pub fn load() -> ConfigResult<Self> {
        let mut figment = Figment::new();
        if let Some(path) = Self::find_config_file() {
            info!(path = %path.display(), "loading host configuration");
            figment = figment.merge(Toml::file(path));
        } else {
            info!("no configuration file found, using defaults");
        }
        Self::extract(figment)
    }

    /// Loads configuration from a specific file, with environment overrides.
    ///
    /// # Errors
    ///
    /// Fails when the file does not exist or does not deserialize.
    pub fn load_from_file(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path));
        }
        Self::extract(Figment::from(Toml::file(path)))
    }

    /// Loads configuration from a TOML string, with environment overrides.
    pub fn load_from_str(toml: &str) -> ConfigResult<Self> {
        Self::extract(Figment::from(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> ConfigResult<Self> {
        Ok(figment.merge(Env::prefixed("VESSEL_")).extract()?)
    }

    fn find_config_file() -> Option<PathBuf> {
        let mut search = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            search.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            search.push(config_dir.join("vessel"));
        }
        for directory in search {
            let path = directory.join(Self::FILE_NAME);
            debug!(path = %path.display(), "checking for config file");
            if path.exists() {
                return Some(path);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = HostConfig::load_from_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert!(config.log_file.is_none());
        assert_eq!(config.server_version, Version::new(1, 0, 0));
    }

    #[test]
    fn toml_values_override_defaults() {
        let config = HostConfig::load_from_str(
            r#"
            log_level = "vessel=debug"
            log_file = "logs/vessel.log"
            server_version = "2.4.1"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "vessel=debug");
        assert_eq!(
            config.log_file.as_deref(),
            Some(std::path::Path::new("logs/vessel.log"))
        );
        assert_eq!(config.server_version, Version::new(2, 4, 1));
    }

    #[test]
    fn malformed_version_is_rejected() {
        assert!(HostConfig::load_from_str("server_version = \"not-a-version\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(matches!(
            HostConfig::load_from_file("/nonexistent/vessel.toml").unwrap_err(),
            ConfigError::FileNotFound(_)
        ));
    }
}
