//! In-memory artifact repository used by the command tests.

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::Mutex,
};

use artifact_client::{ArtifactEntry, ArtifactRepository, Error as ClientError};
use async_trait::async_trait;

/// Mock repository serving canned listings and file contents.
///
/// Every call is recorded so tests can assert what a command asked for.
#[derive(Debug, Default)]
pub(crate) struct MockArtifactRepository {
    listings: HashMap<String, Vec<ArtifactEntry>>,
    files: HashMap<String, Vec<u8>>,
    failure_status: Option<u16>,
    calls: Mutex<Vec<String>>,
}

impl MockArtifactRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_listing(mut self, path: &str, entries: Vec<ArtifactEntry>) -> Self {
        self.listings.insert(path.to_string(), entries);
        self
    }

    pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files
            .insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    /// Makes every remote operation fail with `status`.
    pub(crate) fn failing_with(mut self, status: u16) -> Self {
        self.failure_status = Some(status);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_write(&self, path: &str) -> Result<(), ClientError> {
        match self.failure_status {
            Some(status) => Err(ClientError::RemoteWrite {
                uri: format!("mock://artifacts/{path}"),
                status,
                body: String::new(),
            }),
            None => Ok(()),
        }
    }

    fn read_error(path: &str, status: u16) -> ClientError {
        ClientError::RemoteRead {
            uri: format!("mock://artifacts/{path}"),
            status,
            body: String::new(),
        }
    }
}

#[async_trait]
impl ArtifactRepository for MockArtifactRepository {
    async fn upload_file(
        &self,
        local_file: &Path,
        artifact_path: Option<&str>,
    ) -> Result<(), ClientError> {
        let dest = artifact_path.unwrap_or_default();
        self.record(format!("upload_file {} -> {dest}", local_file.display()));
        self.check_write(dest)
    }

    async fn upload_directory(
        &self,
        local_dir: &Path,
        artifact_path: Option<&str>,
    ) -> Result<(), ClientError> {
        let dest = artifact_path.unwrap_or_default();
        self.record(format!("upload_directory {} -> {dest}", local_dir.display()));
        self.check_write(dest)
    }

    async fn list_entries(&self, path: Option<&str>) -> Result<Vec<ArtifactEntry>, ClientError> {
        let key = path.unwrap_or_default().trim_matches('/');
        self.record(format!("list_entries {key}"));
        if let Some(status) = self.failure_status {
            return Err(Self::read_error(key, status));
        }
        Ok(self.listings.get(key).cloned().unwrap_or_default())
    }

    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<(), ClientError> {
        self.record(format!("download_file {remote_path}"));
        if let Some(status) = self.failure_status {
            return Err(Self::read_error(remote_path, status));
        }
        let content = self
            .files
            .get(remote_path)
            .ok_or_else(|| Self::read_error(remote_path, 404))?;
        fs::write(local_path, content).map_err(|source| ClientError::Io {
            path: local_path.to_path_buf(),
            source,
        })
    }
}
