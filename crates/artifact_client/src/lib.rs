//! Crate for storing experiment artifacts in a remote artifact service over HTTP.
//!
//! The service exposes a RESTful surface rooted at an artifact URI: directory
//! listings are JSON arrays, uploads are `multipart/form-data` POSTs and
//! downloads are plain GETs. [`HttpArtifactRepository`] speaks that protocol
//! and exposes it through the [`ArtifactRepository`] trait.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::ArtifactEntry;

pub mod multipart;
pub use multipart::{MultipartForm, ARTIFACTS_FIELD};

pub mod tree;
pub use tree::UploadLevel;

pub mod uri;
pub use uri::ArtifactUri;

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Path-addressed access to a remote artifact store.
///
/// Every operation is a sequence of independent request/response exchanges.
/// Nothing is retried, and multi-request operations stop at the first failure
/// without undoing the requests that already succeeded.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Uploads a single file to `artifact_path/<file name>`.
    ///
    /// # Arguments
    ///
    /// * `local_file` - The file to upload.
    /// * `artifact_path` - Destination directory below the artifact root, or
    ///   `None` for the root.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteWrite` if the service rejects the upload.
    async fn upload_file(&self, local_file: &Path, artifact_path: Option<&str>)
        -> Result<(), Error>;

    /// Uploads a local directory tree below `artifact_path`.
    ///
    /// One request is sent per local directory that directly holds files,
    /// batching all of that directory's files.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteWrite` for the first level the service rejects.
    /// Levels uploaded before it stay uploaded.
    async fn upload_directory(
        &self,
        local_dir: &Path,
        artifact_path: Option<&str>,
    ) -> Result<(), Error>;

    /// Lists the direct children of `path` (the root when `None` or empty).
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteRead` if the service rejects the request.
    async fn list_entries(&self, path: Option<&str>) -> Result<Vec<ArtifactEntry>, Error>;

    /// Downloads one artifact to `local_path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteRead` if the service rejects the request and
    /// `Error::Http` if the transfer breaks off. In both cases `local_path` is
    /// left as it was.
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<(), Error>;

    /// Downloads `remote_path` and everything below it into `local_dir`.
    ///
    /// A path whose listing is empty is treated as a single file and lands in
    /// `local_dir/<file name>`. Returns the local files written.
    ///
    /// # Errors
    ///
    /// Returns the first error of the underlying listings and downloads, or
    /// `Error::InvalidRemotePath` if a listed path would land outside
    /// `local_dir` or is not below the directory whose listing returned it.
    async fn download_directory(
        &self,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<Vec<PathBuf>, Error> {
        let remote_root = remote_path.trim_matches('/');
        let entries = self.list_entries(Some(remote_root)).await?;
        let mut written = Vec::new();

        if entries.is_empty() {
            // Either an empty directory or a plain file.
            let Some(name) = remote_root.rsplit('/').next().filter(|n| !n.is_empty()) else {
                return Ok(written);
            };
            let target = local_dir.join(tree::local_relative_path("", name)?);
            create_dir_all(local_dir).await?;
            self.download_file(remote_root, &target).await?;
            written.push(target);
            return Ok(written);
        }

        let mut pending = VecDeque::from([(remote_root.to_string(), entries)]);
        while let Some((listed, entries)) = pending.pop_front() {
            for entry in entries {
                // Entries must sit strictly below the listed directory, so every
                // nested listing goes one level deeper and the walk terminates.
                tree::local_relative_path(&listed, &entry.path)?;
                let target = local_dir.join(tree::local_relative_path(remote_root, &entry.path)?);
                if entry.is_directory {
                    create_dir_all(&target).await?;
                    let children = self.list_entries(Some(&entry.path)).await?;
                    pending.push_back((entry.path.trim_matches('/').to_string(), children));
                } else {
                    if let Some(parent) = target.parent() {
                        create_dir_all(parent).await?;
                    }
                    self.download_file(&entry.path, &target).await?;
                    written.push(target);
                }
            }
        }

        Ok(written)
    }
}

/// An [`ArtifactRepository`] backed by a RESTful artifact service.
///
/// # Example
///
/// ```rust,no_run
/// use artifact_client::{ArtifactRepository, HttpArtifactRepository};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), artifact_client::Error> {
/// let repository = HttpArtifactRepository::new(
///     "http://localhost:5000/api/1.0/artifact-repository/0/YyMOD18lNmU/artifacts",
/// )?;
///
/// repository.upload_file(Path::new("train.csv"), Some("data")).await?;
/// for entry in repository.list_entries(Some("data")).await? {
///     println!("{} {:?}", entry.path, entry.size);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpArtifactRepository {
    root: ArtifactUri,
    client: Client,
    multipart_boundary: Option<String>,
}

impl HttpArtifactRepository {
    /// Creates a repository rooted at `artifact_uri` using a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBaseUri` if the URI is not an absolute http(s)
    /// URI and `Error::Http` if the HTTP client cannot be built.
    pub fn new(artifact_uri: &str) -> Result<Self, Error> {
        let client = Client::builder().build()?;
        Self::with_client(artifact_uri, client)
    }

    /// Creates a repository rooted at `artifact_uri` that sends its requests
    /// through `client`.
    ///
    /// Use this to apply timeouts, proxies or default headers.
    pub fn with_client(artifact_uri: &str, client: Client) -> Result<Self, Error> {
        Ok(Self {
            root: ArtifactUri::parse(artifact_uri)?,
            client,
            multipart_boundary: None,
        })
    }

    /// Uses a fixed multipart boundary for every upload instead of a random one.
    pub fn with_multipart_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.multipart_boundary = Some(boundary.into());
        self
    }

    /// The artifact root all paths are resolved against.
    pub fn artifact_uri(&self) -> &ArtifactUri {
        &self.root
    }

    fn new_form(&self) -> MultipartForm {
        MultipartForm::new(self.multipart_boundary.clone())
    }

    async fn post_form(&self, uri: &Url, form: MultipartForm) -> Result<(), Error> {
        let file_count = form.len();
        let response = self
            .client
            .post(uri.clone())
            .header(CONTENT_TYPE, form.content_type())
            .body(form.into_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response_body(response).await;
            error!(
                uri = %uri,
                status = status.as_u16(),
                "Artifact service rejected upload"
            );
            return Err(Error::RemoteWrite {
                uri: uri.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(uri = %uri, file_count = file_count, "Uploaded artifacts");
        Ok(())
    }
}

#[async_trait]
impl ArtifactRepository for HttpArtifactRepository {
    #[instrument(skip(self))]
    async fn upload_file(
        &self,
        local_file: &Path,
        artifact_path: Option<&str>,
    ) -> Result<(), Error> {
        let file_name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidLocalPath(format!("{local_file:?} has no usable file name"))
            })?;
        let uri = self
            .root
            .resource([artifact_path.unwrap_or_default(), file_name]);
        info!(uri = %uri, "Uploading artifact");

        let mut form = self.new_form();
        form.add_file(ARTIFACTS_FIELD, local_file).await?;
        self.post_form(&uri, form).await
    }

    #[instrument(skip(self))]
    async fn upload_directory(
        &self,
        local_dir: &Path,
        artifact_path: Option<&str>,
    ) -> Result<(), Error> {
        let levels = tree::plan_directory_upload(local_dir)?;
        info!(
            level_count = levels.len(),
            "Uploading artifact directory"
        );

        for level in levels {
            let uri = self.root.collection([
                artifact_path.unwrap_or_default(),
                level.artifact_path.as_str(),
            ]);
            info!(uri = %uri, file_count = level.files.len(), "Uploading directory level");

            let mut form = self.new_form();
            for file in &level.files {
                form.add_file(ARTIFACTS_FIELD, file).await?;
            }
            self.post_form(&uri, form).await?;
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_entries(&self, path: Option<&str>) -> Result<Vec<ArtifactEntry>, Error> {
        let uri = self.root.collection([path.unwrap_or_default()]);
        info!(uri = %uri, "Listing artifacts");

        let response = self.client.get(uri.clone()).send().await?;
        let response = ensure_read_success(&uri, response).await?;
        let body = response.text().await?;

        let entries: Vec<ArtifactEntry> = serde_json::from_str(&body)?;
        debug!(uri = %uri, entry_count = entries.len(), "Listed artifacts");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<(), Error> {
        let uri = self.root.resource([remote_path]);
        info!(uri = %uri, "Downloading artifact");

        let response = self
            .client
            .get(uri.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .send()
            .await?;
        let response = ensure_read_success(&uri, response).await?;

        // Stream into a sibling temporary file; it is only renamed over
        // `local_path` once the whole body has arrived and is deleted otherwise.
        let directory = match local_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp_file = tempfile::Builder::new()
            .prefix(".artifact-download-")
            .tempfile_in(directory)
            .map_err(|e| Error::io(directory, e))?;
        let (std_file, temp_path) = temp_file.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);
        if let Some(permissions) = download_permissions(local_path).await {
            file.set_permissions(permissions)
                .await
                .map_err(|e| Error::io(local_path, e))?;
        }

        let mut byte_count: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.inspect_err(|e| {
                error!(uri = %uri, error = %e, "Artifact download interrupted");
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(local_path, e))?;
            byte_count += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| Error::io(local_path, e))?;
        drop(file);

        temp_path
            .persist(local_path)
            .map_err(|e| Error::io(local_path, e.error))?;

        debug!(uri = %uri, byte_count = byte_count, "Downloaded artifact");
        Ok(())
    }
}

/// Turns a non-2xx response to a GET into `Error::RemoteRead`.
async fn ensure_read_success(uri: &Url, response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response_body(response).await;
    error!(
        uri = %uri,
        status = status.as_u16(),
        "Artifact service rejected read"
    );
    Err(Error::RemoteRead {
        uri: uri.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Reads an error response body for diagnostics; an unreadable body is empty.
async fn response_body(response: Response) -> String {
    response.text().await.unwrap_or_default()
}

/// Permissions for a downloaded file: those of the file it replaces, or `0644`
/// for a new one on Unix. Temp files start out as `0600`.
async fn download_permissions(local_path: &Path) -> Option<std::fs::Permissions> {
    match tokio::fs::metadata(local_path).await {
        Ok(metadata) if metadata.is_file() => Some(metadata.permissions()),
        _ => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<std::fs::Permissions> {
    None
}

async fn create_dir_all(path: &Path) -> Result<(), Error> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io(path, e))
}
