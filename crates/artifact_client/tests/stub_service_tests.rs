//! Round-trip tests against an in-process artifact service.
//!
//! The stub service keeps uploaded files in memory and answers listings and
//! downloads from them, so writes made through the client can be read back.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use artifact_client::{ArtifactEntry, ArtifactRepository, HttpArtifactRepository};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

const ARTIFACTS_PREFIX: &str = "/artifacts";

/// One multipart POST received by the stub: request path and part file names.
type RecordedUpload = (String, Vec<String>);

#[derive(Clone, Default)]
struct StubArtifactService {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
}

impl StubArtifactService {
    fn list(&self, directory: &str) -> Vec<Value> {
        let prefix = if directory.is_empty() {
            String::new()
        } else {
            format!("{directory}/")
        };

        let files = self.files.lock().unwrap();
        let mut directories = BTreeSet::new();
        let mut entries = Vec::new();
        for (path, content) in files.iter() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    directories.insert(format!("{prefix}{child}"));
                }
                None => entries.push(json!({"path": path, "size": content.len()})),
            }
        }

        directories
            .into_iter()
            .map(|d| json!({"path": d, "is_dir": true}))
            .chain(entries)
            .collect()
    }

    fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

async fn handle(State(service): State<StubArtifactService>, request: Request) -> Response {
    let request_path = request.uri().path().to_string();
    let Some(relative) = request_path.strip_prefix(ARTIFACTS_PREFIX) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let is_collection = relative.is_empty() || relative.ends_with('/');
    let relative = relative.trim_matches('/').to_string();

    let method = request.method().clone();
    match method {
        Method::GET if is_collection => Json(service.list(&relative)).into_response(),
        Method::GET => {
            let content = service.files.lock().unwrap().get(&relative).cloned();
            match content {
                Some(content) => content.into_response(),
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
        Method::POST => {
            let mut multipart = match Multipart::from_request(request, &service).await {
                Ok(multipart) => multipart,
                Err(rejection) => return rejection.into_response(),
            };

            let mut names = Vec::new();
            while let Ok(Some(field)) = multipart.next_field().await {
                if field.name() != Some("artifacts") {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    return StatusCode::BAD_REQUEST.into_response();
                };
                let Ok(content) = field.bytes().await else {
                    return StatusCode::BAD_REQUEST.into_response();
                };

                let path = match (is_collection, relative.is_empty()) {
                    (true, true) => file_name.clone(),
                    (true, false) => format!("{relative}/{file_name}"),
                    (false, _) => relative.clone(),
                };
                service.files.lock().unwrap().insert(path, content.to_vec());
                names.push(file_name);
            }

            service
                .uploads
                .lock()
                .unwrap()
                .push((request_path.clone(), names));
            Json(json!({"status": "success"})).into_response()
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn spawn_stub_service() -> (HttpArtifactRepository, StubArtifactService) {
    let service = StubArtifactService::default();
    let app = Router::new().fallback(handle).with_state(service.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub service");
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let repository = HttpArtifactRepository::new(&format!("http://{address}{ARTIFACTS_PREFIX}"))
        .expect("Failed to create repository");
    (repository, service)
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_upload_then_list_parent() {
    let (repository, _service) = spawn_stub_service().await;
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write(temp_dir.path(), "train.csv", "a,b,c\n1,2,3\n4,5");

    repository
        .upload_file(&temp_dir.path().join("train.csv"), Some("data"))
        .await
        .unwrap();

    let entries = repository.list_entries(Some("data")).await.unwrap();
    assert_eq!(entries, vec![ArtifactEntry::file("data/train.csv", 15)]);

    let root = repository.list_entries(None).await.unwrap();
    assert_eq!(root, vec![ArtifactEntry::directory("data")]);
}

#[tokio::test]
async fn test_listing_a_file_is_empty() {
    let (repository, _service) = spawn_stub_service().await;
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write(temp_dir.path(), "v1.pkl", "weights");

    repository
        .upload_file(&temp_dir.path().join("v1.pkl"), Some("model"))
        .await
        .unwrap();

    assert!(repository
        .list_entries(Some("model/v1.pkl"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_upload_directory_sends_one_request_per_level() {
    let (repository, service) = spawn_stub_service().await;
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path();
    write(root, "train.csv", "train");
    write(root, "test.csv", "test");
    write(root, "models/v1.pkl", "v1");
    write(root, "models/v2.pkl", "v2");
    write(root, "models/deep/v3.pkl", "v3");
    write(root, "only_dirs/inner/notes.txt", "notes");
    fs::create_dir_all(root.join("empty")).unwrap();

    repository
        .upload_directory(root, Some("run"))
        .await
        .unwrap();

    let uploads = service.uploads();
    assert_eq!(
        uploads,
        vec![
            (
                "/artifacts/run/".to_string(),
                vec!["test.csv".to_string(), "train.csv".to_string()]
            ),
            (
                "/artifacts/run/models/".to_string(),
                vec!["v1.pkl".to_string(), "v2.pkl".to_string()]
            ),
            (
                "/artifacts/run/models/deep/".to_string(),
                vec!["v3.pkl".to_string()]
            ),
            (
                "/artifacts/run/only_dirs/inner/".to_string(),
                vec!["notes.txt".to_string()]
            ),
        ]
    );

    assert_eq!(
        repository.list_entries(Some("run")).await.unwrap(),
        vec![
            ArtifactEntry::directory("run/models"),
            ArtifactEntry::directory("run/only_dirs"),
            ArtifactEntry::file("run/test.csv", 4),
            ArtifactEntry::file("run/train.csv", 5),
        ]
    );
}

#[tokio::test]
async fn test_upload_directory_then_download_directory() {
    let (repository, _service) = spawn_stub_service().await;
    let source = TempDir::new().expect("Failed to create temp directory");
    let target = TempDir::new().expect("Failed to create temp directory");
    write(source.path(), "metrics.json", "{\"loss\": 0.25}");
    write(source.path(), "model/weights.bin", "0123456789");
    write(source.path(), "model/config/params.yaml", "lr: 0.01\n");

    repository
        .upload_directory(source.path(), None)
        .await
        .unwrap();
    let mut written = repository
        .download_directory("model", target.path())
        .await
        .unwrap();
    written.sort();

    assert_eq!(
        written,
        vec![
            target.path().join("config").join("params.yaml"),
            target.path().join("weights.bin"),
        ]
    );
    assert_eq!(
        fs::read_to_string(target.path().join("weights.bin")).unwrap(),
        "0123456789"
    );
    assert_eq!(
        fs::read_to_string(target.path().join("config").join("params.yaml")).unwrap(),
        "lr: 0.01\n"
    );
}

#[tokio::test]
async fn test_download_missing_artifact() {
    let (repository, _service) = spawn_stub_service().await;
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let destination = temp_dir.path().join("missing.bin");

    let result = repository.download_file("missing.bin", &destination).await;

    assert_eq!(result.unwrap_err().status(), Some(404));
    assert!(!destination.exists());
}
