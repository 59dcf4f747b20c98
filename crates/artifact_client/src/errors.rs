//! Error types for artifact repository operations.
//!
//! This module defines the error types that can occur when talking to a remote
//! artifact service through the artifact_client crate. Remote failures carry the
//! request URI, the HTTP status and the response body so callers can report
//! what the service said.

use std::path::PathBuf;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during artifact repository operations.
///
/// No operation retries or recovers internally. Any error means the operation
/// did not fully complete; for a directory upload there is no guarantee about
/// how many levels reached the service before the failure.
///
/// ## Examples
///
/// ```rust,ignore
/// use artifact_client::Error;
///
/// match repository.list_entries(Some("model")).await {
///     Ok(entries) => println!("{} entries", entries.len()),
///     Err(Error::RemoteRead { status, .. }) => eprintln!("Service answered {status}"),
///     Err(err) => eprintln!("Other error: {err}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service rejected an upload.
    ///
    /// Returned when a multipart POST gets a status outside the 2xx range.
    #[error("Failed to write artifacts to {uri}: HTTP {status}")]
    RemoteWrite {
        uri: String,
        status: u16,
        body: String,
    },

    /// The service rejected a listing or download request.
    ///
    /// Returned when a GET gets a status outside the 2xx range.
    #[error("Failed to read artifacts from {uri}: HTTP {status}")]
    RemoteRead {
        uri: String,
        status: u16,
        body: String,
    },

    /// The HTTP exchange itself failed.
    ///
    /// Covers connection failures and connections dropped while a response
    /// body was still streaming.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A local filesystem operation failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error deserializing a directory listing.
    ///
    /// The service answered 2xx but the body is not a JSON array of entries.
    #[error("Failed to deserialize artifact listing: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The artifact root URI is not an absolute http(s) URI.
    #[error("Invalid artifact URI: {0}")]
    InvalidBaseUri(String),

    /// A local path cannot be used for the requested operation.
    #[error("Invalid local path: {0}")]
    InvalidLocalPath(String),

    /// The service listed a path that would escape the download directory.
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// The HTTP status returned by the service, if the error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RemoteWrite { status, .. } | Error::RemoteRead { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
