//! Command modules for the artifact CLI.
//!
//! Each submodule handles a specific command category:
//!
//! - `config_cmd`: Creating and showing the CLI configuration file
//! - `download_cmd`: Fetching single artifacts or artifact trees
//! - `list_cmd`: Listing the entries below an artifact path
//! - `upload_cmd`: Logging single files or directory trees as artifacts
//!
//! Artifact commands take the repository as `&dyn ArtifactRepository` and
//! write their output to a caller supplied writer.

pub mod config_cmd;
pub mod download_cmd;
pub mod list_cmd;
pub mod upload_cmd;

#[cfg(test)]
pub(crate) mod test_support;
