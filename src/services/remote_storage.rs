use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use validator::Validate;

use crate::config::CloudinaryKeys;

#[derive(Error, Debug)]
pub enum RemoteStorageError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Remote service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to read staged file: {0}")]
    Io(#[from] std::io::Error),
}

/// Descriptor returned by the image host after a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteUpload {
    pub secure_url: String,
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[async_trait]
pub trait RemoteImageStore: Send + Sync {
    /// Upload the file at `path` and return where the host serves it.
    async fn upload(&self, path: &Path) -> Result<RemoteUpload, RemoteStorageError>;

    /// Short provider identifier used in logs and health output.
    fn provider(&self) -> &'static str;

    /// Whether credentials are present. Says nothing about their validity.
    fn is_configured(&self) -> bool;
}

pub struct CloudinaryStorage {
    client: reqwest::Client,
    keys: CloudinaryKeys,
    api_base: String,
}

#[derive(Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

impl CloudinaryStorage {
    pub fn new(client: reqwest::Client, keys: CloudinaryKeys, api_base: impl Into<String>) -> Self {
        Self {
            client,
            keys,
            api_base: api_base.into(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.api_base.trim_end_matches('/'),
            self.keys.cloud_name
        )
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<CloudinaryErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            })
    }
}

/// Signature over the signed upload parameters.
///
/// Parameters are sorted by name, joined as `k=v` with `&`, the secret is
/// appended and the result hashed with SHA-256.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl RemoteImageStore for CloudinaryStorage {
    async fn upload(&self, path: &Path) -> Result<RemoteUpload, RemoteStorageError> {
        self.keys.validate().map_err(|e| {
            RemoteStorageError::Authentication(format!("Cloudinary credentials incomplete: {}", e))
        })?;

        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(&[("timestamp", timestamp.as_str())], &self.keys.api_secret);

        let form = Form::new()
            .text("api_key", self.keys.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature)
            .part("file", Part::bytes(data).file_name(file_name));

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteStorageError::Authentication(
                Self::error_message(response).await,
            ));
        }
        if !status.is_success() {
            return Err(RemoteStorageError::Service {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            });
        }

        let upload: RemoteUpload = response
            .json()
            .await
            .map_err(|e| RemoteStorageError::InvalidResponse(e.to_string()))?;

        if upload.secure_url.trim().is_empty() {
            return Err(RemoteStorageError::InvalidResponse(
                "secure_url is empty".to_string(),
            ));
        }

        tracing::info!(
            "☁️  Uploaded to Cloudinary: public_id={}, url={}",
            upload.public_id,
            upload.secure_url
        );

        Ok(upload)
    }

    fn provider(&self) -> &'static str {
        "cloudinary"
    }

    fn is_configured(&self) -> bool {
        self.keys.is_complete()
    }
}
