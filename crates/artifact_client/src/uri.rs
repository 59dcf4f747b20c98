//! Artifact root URI handling.
//!
//! Every request the client makes targets the artifact root URI extended with
//! slash separated sub-paths. Listings and directory uploads address a
//! collection and always end with a slash; single file uploads and downloads
//! address a resource and never do.

use std::path::{Component, Path};

use url::Url;

use crate::errors::Error;

#[cfg(test)]
#[path = "uri_tests.rs"]
mod tests;

/// The artifact root that all repository paths are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactUri {
    base: Url,
}

impl ArtifactUri {
    /// Parses an artifact root URI.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBaseUri` if the value is not an absolute `http` or
    /// `https` URI.
    pub fn parse(uri: &str) -> Result<Self, Error> {
        let base = Url::parse(uri).map_err(|e| Error::InvalidBaseUri(format!("{uri}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(Error::InvalidBaseUri(format!(
                "{uri}: only http and https URIs are supported"
            )));
        }

        Ok(Self { base })
    }

    /// The root URI as it was configured.
    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    /// Builds the URI of a single resource below the root (no trailing slash).
    ///
    /// ```rust
    /// use artifact_client::ArtifactUri;
    ///
    /// let root = ArtifactUri::parse("http://localhost:5000/runs/0/artifacts").unwrap();
    /// let uri = root.resource(["data", "train.csv"]);
    /// assert_eq!(uri.as_str(), "http://localhost:5000/runs/0/artifacts/data/train.csv");
    /// ```
    pub fn resource<'a, I>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.join(segments, false)
    }

    /// Builds the URI of a collection below the root (always one trailing slash).
    ///
    /// ```rust
    /// use artifact_client::ArtifactUri;
    ///
    /// let root = ArtifactUri::parse("http://localhost:5000/runs/0/artifacts").unwrap();
    /// assert_eq!(root.collection([""]).as_str(), "http://localhost:5000/runs/0/artifacts/");
    /// assert_eq!(root.collection(["model/"]).as_str(), "http://localhost:5000/runs/0/artifacts/model/");
    /// ```
    pub fn collection<'a, I>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.join(segments, true)
    }

    fn join<'a, I>(&self, segments: I, trailing_slash: bool) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base.clone();
        // `parse` rejects cannot-be-a-base URIs, so the path is always editable.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(
                segments
                    .into_iter()
                    .flat_map(|s| s.split('/'))
                    .filter(|s| !s.is_empty() && *s != "."),
            );
            if trailing_slash {
                path.push("");
            }
        }
        url
    }
}

impl std::fmt::Display for ArtifactUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base.as_str())
    }
}

/// Converts a relative local path into a forward slash artifact path.
///
/// `.` components are dropped, so the root of a walk maps to an empty string.
///
/// # Errors
///
/// Returns `Error::InvalidLocalPath` for absolute paths, `..` components or
/// names that are not valid UTF-8.
pub fn relative_path_to_artifact_path(path: &Path) -> Result<String, Error> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    Error::InvalidLocalPath(format!("{path:?} is not valid UTF-8"))
                })?;
                parts.push(name);
            }
            _ => {
                return Err(Error::InvalidLocalPath(format!(
                    "{path:?} is not a relative path"
                )))
            }
        }
    }

    Ok(parts.join("/"))
}
