use std::io;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the artifact CLI application.
///
/// This enum represents all possible error conditions that can arise during
/// CLI operations, including configuration issues, failed artifact service
/// calls and problems writing command output.
#[derive(Error, Debug)]
pub enum Error {
    /// An artifact repository operation failed.
    ///
    /// Wraps the error reported by the artifact client, such as a rejected
    /// upload or a download that broke off.
    #[error("Artifact operation failed: {0}")]
    Artifact(#[from] artifact_client::Error),

    /// Configuration error occurred while loading or parsing configuration.
    ///
    /// This error is returned when there are issues with the configuration file,
    /// such as missing required fields, invalid values, or file access problems.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line arguments were provided.
    ///
    /// This error is returned when the user provides invalid or incompatible
    /// command-line arguments that cannot be processed.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Failed to write command output.
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),

    /// Failed to render command output as JSON.
    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}
