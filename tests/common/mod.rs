#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use image_upload_service::config::AppConfig;
use image_upload_service::infrastructure::database;
use image_upload_service::services::image_repository::ImageRepository;
use image_upload_service::services::remote_storage::{
    RemoteImageStore, RemoteStorageError, RemoteUpload,
};
use image_upload_service::services::staging::LocalStager;
use image_upload_service::services::upload_service::ImageUploadService;
use image_upload_service::{AppState, create_app};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "X-IMAGE-UPLOAD-BOUNDARY";

#[derive(Clone, Copy, Debug)]
pub enum RemoteMode {
    Succeed,
    RejectCredentials,
    /// Accepts the file but removes the staged copy before answering.
    SucceedAndDeleteStaged,
}

#[derive(Clone, Debug)]
pub struct RemoteCall {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// In-memory stand-in for the image host.
pub struct FakeRemote {
    mode: RemoteMode,
    calls: Mutex<Vec<RemoteCall>>,
}

impl FakeRemote {
    pub fn new(mode: RemoteMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteImageStore for FakeRemote {
    async fn upload(&self, path: &Path) -> Result<RemoteUpload, RemoteStorageError> {
        let bytes = tokio::fs::read(path).await?;
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RemoteCall {
                path: path.to_path_buf(),
                bytes: bytes.clone(),
            });
            calls.len()
        };

        match self.mode {
            RemoteMode::Succeed | RemoteMode::SucceedAndDeleteStaged => {
                if let RemoteMode::SucceedAndDeleteStaged = self.mode {
                    tokio::fs::remove_file(path).await?;
                }
                let public_id = format!("img{}", 122 + n);
                Ok(RemoteUpload {
                    secure_url: format!("https://host/{}.jpg", public_id),
                    public_id,
                    format: Some("jpg".to_string()),
                    bytes: Some(bytes.len() as u64),
                    width: None,
                    height: None,
                })
            }
            RemoteMode::RejectCredentials => Err(RemoteStorageError::Authentication(
                "Invalid api_key".to_string(),
            )),
        }
    }

    fn provider(&self) -> &'static str {
        "fake"
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub uploads: Arc<ImageUploadService>,
    pub staging: TempDir,
}

impl TestApp {
    pub async fn with_remote(remote: Arc<dyn RemoteImageStore>) -> Self {
        Self::build(remote, |_| {}).await
    }

    pub async fn build(
        remote: Arc<dyn RemoteImageStore>,
        tweak: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let staging = tempfile::tempdir().unwrap();
        let db = Database::connect("sqlite::memory:").await.unwrap();
        database::run_migrations(&db).await.unwrap();

        let mut config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            staging_dir: staging.path().to_path_buf(),
            ..AppConfig::default()
        };
        tweak(&mut config);

        let uploads = Arc::new(ImageUploadService::new(
            LocalStager::new(config.staging_dir.clone()),
            remote,
            ImageRepository::new(db.clone()),
            config.upload_timeout,
        ));

        let app = create_app(AppState {
            db: db.clone(),
            uploads: uploads.clone(),
            config,
        });

        Self {
            app,
            db,
            uploads,
            staging,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn upload(&self, parts: &[Part<'_>]) -> (u16, Value) {
        let response = self.send(upload_request(parts)).await;
        let status = response.status().as_u16();
        (status, json_body(response).await)
    }

    pub async fn row_count(&self) -> u64 {
        self.uploads.images().count().await.unwrap()
    }

    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging.path()).unwrap().count()
    }
}

pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "file",
            file_name: Some(file_name),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/image")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// 10 KB of bytes that start like a JPEG.
pub fn fake_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend((0..10 * 1024 - 4).map(|i| (i % 251) as u8));
    data
}
