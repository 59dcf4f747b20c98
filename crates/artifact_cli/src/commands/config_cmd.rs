use std::io::Write;

use artifact_client::ArtifactUri;
use clap::Subcommand;
use tracing::{debug, error, info, instrument};

use crate::config::{get_config_path, AppConfig, DEFAULT_ARTIFACT_URI};
use crate::errors::Error;

#[cfg(test)]
#[path = "config_cmd_tests.rs"]
mod tests;

/// Subcommands for the config command
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Create initial configuration file
    Init {
        /// Path to save the configuration file
        #[arg(short, long)]
        path: Option<String>,

        /// Replace an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Path to the configuration file
        #[arg(short, long)]
        path: Option<String>,
    },
}

/// Execute the config command
///
/// `config_path` and `artifact_uri` are the global `--config` and
/// `--artifact-uri` values. A subcommand's own `--path` wins over `--config`;
/// `init` stores `artifact_uri` in the new file instead of the default local URI.
#[instrument(skip(out))]
pub fn execute(
    cmd: &ConfigCommands,
    config_path: Option<&str>,
    artifact_uri: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), Error> {
    match cmd {
        ConfigCommands::Init { path, force } => {
            init_config(path.as_deref().or(config_path), artifact_uri, *force, out)
        }
        ConfigCommands::Show { path } => show_config(path.as_deref().or(config_path), out),
    }
}

/// Initialize a new configuration file
#[instrument(skip(out))]
fn init_config(
    path: Option<&str>,
    artifact_uri: Option<&str>,
    force: bool,
    out: &mut dyn Write,
) -> Result<(), Error> {
    let config_path = get_config_path(path);
    debug!(message = "Initializing configuration", path = ?config_path);

    if config_path.exists() && !force {
        let err = Error::Config(format!(
            "Configuration file already exists at {:?}",
            config_path
        ));
        error!(
            message = "Configuration file already exists",
            path = ?config_path,
            error = ?err
        );
        return Err(err);
    }

    let artifact_uri = ArtifactUri::parse(artifact_uri.unwrap_or(DEFAULT_ARTIFACT_URI))
        .map_err(|e| Error::Config(e.to_string()))?;

    let config = AppConfig::with_artifact_uri(artifact_uri.as_str());
    config.save(&config_path)?;

    info!(message = "Configuration initialized", path = ?config_path);
    writeln!(out, "Configuration initialized at {:?}", config_path)?;
    Ok(())
}

/// Print the configuration file as TOML
#[instrument(skip(out))]
fn show_config(path: Option<&str>, out: &mut dyn Write) -> Result<(), Error> {
    let config_path = get_config_path(path);
    debug!(message = "Showing configuration", path = ?config_path);

    let config = AppConfig::load(&config_path)?;
    write!(out, "{}", config.to_toml()?)?;
    Ok(())
}
