//! Listing command for the artifact CLI.
//!
//! ```bash
//! # List the artifact root
//! artifact-cli ls
//!
//! # List a directory as JSON in the service's listing format
//! artifact-cli ls model --json
//! ```

use std::io::Write;

use artifact_client::{ArtifactEntry, ArtifactRepository};
use tracing::{debug, instrument};

use crate::errors::Error;

#[cfg(test)]
#[path = "list_cmd_tests.rs"]
mod tests;

/// Lists the direct children of `path` and writes them to `out`.
///
/// Plain output has one line per entry: `d` for directories or `-` for files,
/// the size (blank when unknown) and the artifact path. With `json` set the
/// entries are printed as a pretty JSON array using the service's field names.
#[instrument(skip(repository, out))]
pub async fn list_artifacts(
    repository: &dyn ArtifactRepository,
    path: Option<&str>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), Error> {
    let entries = repository.list_entries(path).await?;
    debug!(message = "Listed artifacts", count = entries.len());

    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }

    for entry in &entries {
        writeln!(out, "{}", format_entry(entry))?;
    }
    Ok(())
}

/// Formats one listing line.
pub fn format_entry(entry: &ArtifactEntry) -> String {
    let kind = if entry.is_directory { 'd' } else { '-' };
    let size = entry.size.map(|s| s.to_string()).unwrap_or_default();
    format!("{kind} {size:>12} {}", entry.path)
}
