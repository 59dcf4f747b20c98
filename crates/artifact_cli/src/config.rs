//! Configuration management for the artifact CLI.
//!
//! The only setting the CLI needs is the artifact root URI. It can come from
//! the command line, from the environment or from a TOML configuration file,
//! in that order of precedence.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "artifact-cli.toml";

/// Environment variable holding the artifact root URI
pub const ARTIFACT_URI_ENV_VAR: &str = "ARTIFACT_URI";

/// Artifact root written by `config init` when none is given
pub const DEFAULT_ARTIFACT_URI: &str = "http://localhost:5000/api/1.0/artifact-repository/0/default/artifacts";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Main configuration structure for the artifact CLI application.
///
/// # Example TOML Configuration
///
/// ```toml
/// [repository]
/// artifact_uri = "http://localhost:5000/api/1.0/artifact-repository/0/YyMOD18lNmU/artifacts"
/// ```
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Artifact repository settings
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Settings describing which artifact repository the CLI talks to.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Artifact root URI all artifact paths are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_uri: Option<String>,
}

impl AppConfig {
    /// Creates a configuration pointing at `artifact_uri`.
    pub fn with_artifact_uri(artifact_uri: impl Into<String>) -> Self {
        Self {
            repository: RepositoryConfig {
                artifact_uri: Some(artifact_uri.into()),
            },
        }
    }

    /// Loads configuration from a TOML file at the specified path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file does not exist, cannot be read or
    /// does not contain a valid configuration.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read configuration file: {}", e)))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse configuration file: {}", e)))?;

        Ok(config)
    }

    /// Saves the configuration to a TOML file at the specified path.
    ///
    /// Parent directories are created when missing and an existing file is
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration cannot be serialized or the
    /// file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        debug!("Saving configuration to {:?}", path);

        let content = self.to_toml()?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write configuration file: {}", e)))?;

        info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Renders the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))
    }
}

/// Returns the configuration file path, defaulting to the current directory.
pub fn get_config_path(config_path: Option<&str>) -> PathBuf {
    if let Some(path) = config_path {
        PathBuf::from(path)
    } else {
        // Look for config in current directory
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        current_dir.join(DEFAULT_CONFIG_FILENAME)
    }
}

/// Picks the artifact root URI.
///
/// The command line value wins over the environment value, which wins over the
/// `repository.artifact_uri` entry of the configuration file. A missing
/// configuration file is not an error; an unreadable one is.
///
/// # Errors
///
/// Returns `Error::Config` if no source provides a URI or the configuration
/// file cannot be loaded.
pub fn resolve_artifact_uri(
    cli_value: Option<&str>,
    env_value: Option<String>,
    config_path: &Path,
) -> Result<String, Error> {
    if let Some(uri) = cli_value.filter(|v| !v.trim().is_empty()) {
        debug!("Using artifact URI from the command line");
        return Ok(uri.trim().to_string());
    }

    if let Some(uri) = env_value.filter(|v| !v.trim().is_empty()) {
        debug!("Using artifact URI from {}", ARTIFACT_URI_ENV_VAR);
        return Ok(uri.trim().to_string());
    }

    if config_path.exists() {
        if let Some(uri) = AppConfig::load(config_path)?.repository.artifact_uri {
            debug!("Using artifact URI from {:?}", config_path);
            return Ok(uri);
        }
    }

    Err(Error::Config(format!(
        "No artifact URI configured: pass --artifact-uri, set {} or add repository.artifact_uri to {:?}",
        ARTIFACT_URI_ENV_VAR, config_path
    )))
}
