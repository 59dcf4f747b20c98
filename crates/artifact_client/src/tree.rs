//! Mapping between local directory trees and artifact paths.
//!
//! Directory uploads send one request per directory level, so the local tree
//! is first grouped into [`UploadLevel`]s. Directory downloads go the other
//! way and turn listed artifact paths back into local paths.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::Error;
use crate::uri::relative_path_to_artifact_path;

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;

/// One local directory that directly contains at least one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLevel {
    /// Directory path relative to the walked root, with forward slashes
    /// (empty for the root itself)
    pub artifact_path: String,

    /// Files directly inside the directory, sorted by name
    pub files: Vec<PathBuf>,
}

/// Groups the files below `local_dir` by the directory that holds them.
///
/// Directories without files of their own produce no level; they come into
/// existence remotely through the files below them. Levels are ordered parents
/// first, then by name.
///
/// # Errors
///
/// Returns `Error::InvalidLocalPath` if `local_dir` is not a directory and
/// `Error::Io` if the walk fails.
pub fn plan_directory_upload(local_dir: &Path) -> Result<Vec<UploadLevel>, Error> {
    if !local_dir.is_dir() {
        return Err(Error::InvalidLocalPath(format!(
            "{local_dir:?} is not a directory"
        )));
    }

    let mut levels: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for entry in WalkDir::new(local_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| local_dir.to_path_buf());
            Error::io(path, e.into())
        })?;

        // Symlinks count when they point at a regular file.
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }

        let parent = entry.path().parent().unwrap_or(local_dir);
        let relative = parent
            .strip_prefix(local_dir)
            .map_err(|_| Error::InvalidLocalPath(format!("{parent:?} is outside {local_dir:?}")))?
            .to_path_buf();
        levels.entry(relative).or_default().push(entry.into_path());
    }

    let levels = levels
        .into_iter()
        .map(|(relative, files)| {
            Ok(UploadLevel {
                artifact_path: relative_path_to_artifact_path(&relative)?,
                files,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    debug!(
        local_dir = ?local_dir,
        level_count = levels.len(),
        "Planned directory upload"
    );
    Ok(levels)
}

/// Resolves where a listed entry lands inside a local download directory.
///
/// `remote_root` is the artifact path that was downloaded and `entry_path` the
/// full artifact path of one entry below it.
///
/// # Errors
///
/// Returns `Error::InvalidRemotePath` if the entry is not below `remote_root`,
/// is absolute, or contains `..` segments.
pub fn local_relative_path(remote_root: &str, entry_path: &str) -> Result<PathBuf, Error> {
    let remote_root = remote_root.trim_matches('/');
    let trimmed = entry_path.trim_end_matches('/');

    let relative = if remote_root.is_empty() {
        Some(trimmed).filter(|p| !p.starts_with('/'))
    } else {
        trimmed
            .strip_prefix(remote_root)
            .and_then(|rest| rest.strip_prefix('/'))
    };
    let relative = relative.ok_or_else(|| {
        Error::InvalidRemotePath(format!("{entry_path} is not below '{remote_root}'"))
    })?;

    let mut local = PathBuf::new();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(Error::InvalidRemotePath(format!(
                    "{entry_path} contains a parent directory segment"
                )))
            }
            s if !is_plain_name(s) => {
                return Err(Error::InvalidRemotePath(format!(
                    "{entry_path} contains an unsupported segment '{s}'"
                )))
            }
            s => local.push(s),
        }
    }

    if local.as_os_str().is_empty() {
        return Err(Error::InvalidRemotePath(format!(
            "{entry_path} does not name an entry below '{remote_root}'"
        )));
    }
    Ok(local)
}

/// True if `segment` is a single normal path component on this platform.
fn is_plain_name(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
