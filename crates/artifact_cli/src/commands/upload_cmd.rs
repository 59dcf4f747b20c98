//! Upload commands for the artifact CLI.

use std::{io::Write, path::Path};

use artifact_client::ArtifactRepository;
use tracing::{error, info, instrument};

use crate::errors::Error;

#[cfg(test)]
#[path = "upload_cmd_tests.rs"]
mod tests;

/// Uploads one local file to `dest` (the artifact root when `None`).
#[instrument(skip(repository, out))]
pub async fn upload_file(
    repository: &dyn ArtifactRepository,
    local_file: &Path,
    dest: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), Error> {
    if !local_file.is_file() {
        let err = Error::InvalidArguments(format!("{:?} is not a file", local_file));
        error!(message = "Cannot upload", path = ?local_file, error = ?err);
        return Err(err);
    }

    repository.upload_file(local_file, dest).await?;

    info!(message = "File uploaded", path = ?local_file, dest = ?dest);
    writeln!(
        out,
        "Uploaded {} to {}",
        local_file.display(),
        describe_destination(dest)
    )?;
    Ok(())
}

/// Uploads a local directory tree below `dest` (the artifact root when `None`).
///
/// The client sends one request per directory level holding files and stops at
/// the first rejected level, so a failure may leave a partial upload behind.
#[instrument(skip(repository, out))]
pub async fn upload_directory(
    repository: &dyn ArtifactRepository,
    local_dir: &Path,
    dest: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), Error> {
    if !local_dir.is_dir() {
        let err = Error::InvalidArguments(format!("{:?} is not a directory", local_dir));
        error!(message = "Cannot upload", path = ?local_dir, error = ?err);
        return Err(err);
    }

    repository.upload_directory(local_dir, dest).await?;

    info!(message = "Directory uploaded", path = ?local_dir, dest = ?dest);
    writeln!(
        out,
        "Uploaded {} to {}",
        local_dir.display(),
        describe_destination(dest)
    )?;
    Ok(())
}

fn describe_destination(dest: Option<&str>) -> String {
    match dest.map(|d| d.trim_matches('/')).filter(|d| !d.is_empty()) {
        Some(d) => d.to_string(),
        None => "the artifact root".to_string(),
    }
}
