//! Streaming `multipart/form-data` encoding for artifact uploads.
//!
//! The artifact service receives files as form parts that all share one field
//! name. File contents are streamed from disk into the request body, and the
//! boundary can be fixed so that the exact request bytes are reproducible.

use std::path::Path;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::errors::Error;

#[cfg(test)]
#[path = "multipart_tests.rs"]
mod tests;

/// Form field name the artifact service reads uploaded files from.
pub const ARTIFACTS_FIELD: &str = "artifacts";

/// A multipart form made of file parts, encoded lazily as a byte stream.
#[derive(Debug)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<FilePart>,
}

#[derive(Debug)]
struct FilePart {
    field: String,
    file_name: String,
    file: File,
}

impl MultipartForm {
    /// Creates an empty form.
    ///
    /// A random boundary is generated when `boundary` is `None`.
    pub fn new(boundary: Option<String>) -> Self {
        let boundary = boundary.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        Self {
            boundary,
            parts: Vec::new(),
        }
    }

    /// The boundary separating the parts of this form.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Number of file parts in the form.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if the form has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Value for the request `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Opens `path` and appends it as a file part named `field`.
    ///
    /// The part's filename is the basename of `path`. The file stays open until
    /// the body produced by [`MultipartForm::into_body`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLocalPath` if the path has no file name or is not
    /// a regular file and `Error::Io` if the file cannot be opened.
    pub async fn add_file(&mut self, field: &str, path: &Path) -> Result<(), Error> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidLocalPath(format!("{path:?} has no usable file name")))?
            .to_string();

        let file = File::open(path).await.map_err(|e| Error::io(path, e))?;
        let metadata = file.metadata().await.map_err(|e| Error::io(path, e))?;
        if !metadata.is_file() {
            return Err(Error::InvalidLocalPath(format!("{path:?} is not a file")));
        }
        debug!(field = field, file_name = %file_name, "Added file part to multipart form");

        self.parts.push(FilePart {
            field: field.to_string(),
            file_name,
            file,
        });
        Ok(())
    }

    /// Consumes the form and returns the encoded bytes as a stream.
    pub fn into_stream(self) -> BoxStream<'static, std::io::Result<Bytes>> {
        let boundary = self.boundary;
        let mut pieces: Vec<BoxStream<'static, std::io::Result<Bytes>>> = Vec::new();

        for part in self.parts {
            let header = format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n",
                escape_quoted(&part.field),
                escape_quoted(&part.file_name),
            );
            pieces.push(chunk(Bytes::from(header)));
            pieces.push(ReaderStream::new(part.file).boxed());
            pieces.push(chunk(Bytes::from_static(b"\r\n")));
        }
        pieces.push(chunk(Bytes::from(format!("--{boundary}--\r\n"))));

        stream::iter(pieces).flatten().boxed()
    }

    /// Consumes the form and returns a streaming request body.
    pub fn into_body(self) -> reqwest::Body {
        reqwest::Body::wrap_stream(self.into_stream())
    }
}

fn chunk(bytes: Bytes) -> BoxStream<'static, std::io::Result<Bytes>> {
    stream::once(async move { Ok(bytes) }).boxed()
}

/// Escapes a value for use inside a quoted header parameter.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
