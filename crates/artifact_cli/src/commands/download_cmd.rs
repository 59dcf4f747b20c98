//! Download commands for the artifact CLI.
//!
//! ```bash
//! # Fetch one artifact into the current directory
//! artifact-cli download model/weights.bin .
//!
//! # Mirror an artifact directory locally
//! artifact-cli download-dir model ./model
//! ```

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use artifact_client::ArtifactRepository;
use tracing::{error, info, instrument};

use crate::errors::Error;

#[cfg(test)]
#[path = "download_cmd_tests.rs"]
mod tests;

/// Downloads one artifact.
///
/// When `local_path` is an existing directory the artifact is stored inside it
/// under its own file name. Returns the path written.
#[instrument(skip(repository, out))]
pub async fn download_file(
    repository: &dyn ArtifactRepository,
    remote_path: &str,
    local_path: &Path,
    out: &mut dyn Write,
) -> Result<PathBuf, Error> {
    let remote_path = remote_path.trim_matches('/');
    let Some(name) = remote_path.rsplit('/').next().filter(|n| !n.is_empty()) else {
        let err = Error::InvalidArguments("A remote artifact path is required".to_string());
        error!(message = "Cannot download", error = ?err);
        return Err(err);
    };

    let target = if local_path.is_dir() {
        local_path.join(name)
    } else {
        local_path.to_path_buf()
    };

    repository.download_file(remote_path, &target).await?;

    info!(message = "Artifact downloaded", remote = remote_path, path = ?target);
    writeln!(out, "Downloaded {} to {}", remote_path, target.display())?;
    Ok(target)
}

/// Downloads `remote_path` and everything below it into `local_dir`.
///
/// Returns the files written.
#[instrument(skip(repository, out))]
pub async fn download_directory(
    repository: &dyn ArtifactRepository,
    remote_path: &str,
    local_dir: &Path,
    out: &mut dyn Write,
) -> Result<Vec<PathBuf>, Error> {
    if local_dir.is_file() {
        let err = Error::InvalidArguments(format!("{:?} is not a directory", local_dir));
        error!(message = "Cannot download", path = ?local_dir, error = ?err);
        return Err(err);
    }

    let written = repository.download_directory(remote_path, local_dir).await?;

    info!(message = "Artifacts downloaded", count = written.len(), path = ?local_dir);
    for path in &written {
        writeln!(out, "{}", path.display())?;
    }
    writeln!(
        out,
        "Downloaded {} file(s) to {}",
        written.len(),
        local_dir.display()
    )?;
    Ok(written)
}
