//! Artifact listing domain types.
//!
//! This module contains the record type returned when listing the children of
//! a path in the remote artifact store.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// A single child of a listed artifact path.
///
/// Built from one element of the JSON array the artifact service returns for a
/// listing. It is a read-only projection of remote state and is never sent
/// back to the service.
///
/// # Examples
///
/// ```rust
/// use artifact_client::ArtifactEntry;
///
/// let entry: ArtifactEntry =
///     serde_json::from_str(r#"{"path": "model/v1.pkl", "size": 255}"#).unwrap();
///
/// assert_eq!(entry.name(), "v1.pkl");
/// assert!(!entry.is_directory);
/// assert_eq!(entry.size, Some(255));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Full path relative to the artifact root (e.g., "model/v1.pkl"), always
    /// using forward slashes
    pub path: String,

    /// Whether the entry is a directory (false when the service omits it)
    #[serde(rename = "is_dir", default)]
    pub is_directory: bool,

    /// Size in bytes (None for directories or when unknown)
    #[serde(default)]
    pub size: Option<u64>,
}

impl ArtifactEntry {
    /// Creates an entry for a file of known size.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            size: Some(size),
        }
    }

    /// Creates a directory entry.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            size: None,
        }
    }

    /// The last segment of the entry path.
    pub fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}
