use crate::AppState;
use crate::api::error::AppError;
use crate::entities::images;
use crate::services::upload_service::UploadOutcome;
use crate::services::UploadError;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    pub url: String,
    pub created: DateTime<Utc>,
}

impl From<images::Model> for ImageResponse {
    fn from(model: images::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            created: model.created,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadImageResponse {
    /// Local staging path used while handling the request (informational).
    pub path: String,
    pub image: ImageResponse,
}

#[utoipa::path(
    post,
    path = "/api/image",
    request_body(content = Multipart, description = "Multipart form with a `file` field"),
    responses(
        (status = 200, description = "Image uploaded and recorded", body = UploadImageResponse),
        (status = 400, description = "No file provided or malformed multipart body"),
        (status = 413, description = "Request body too large"),
        (status = 500, description = "Staging, remote upload or persistence failed")
    ),
    tag = "images"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadImageResponse>, AppError> {
    let result: Result<Json<UploadImageResponse>, AppError> = async {
        let mut outcome: Option<UploadOutcome> = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                payload_too_large()
            } else {
                AppError::BadRequest(e.body_text())
            }
        })? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" && outcome.is_none() {
                let file_name = field.file_name().map(|s| s.to_string());
                let reader = StreamReader::new(field.map_err(std::io::Error::other));

                outcome = Some(
                    state
                        .uploads
                        .handle_upload(file_name.as_deref(), reader)
                        .await
                        .map_err(|e| match e {
                            UploadError::StorageIo(ref io) if body_limit_exceeded(io) => {
                                payload_too_large()
                            }
                            other => other.into(),
                        })?,
                );
            } else {
                tracing::debug!("Ignoring multipart field '{}'", name);
            }
        }

        let outcome = outcome.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

        Ok(Json(UploadImageResponse {
            path: outcome.path.display().to_string(),
            image: outcome.image.into(),
        }))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Drain the rest of the body so the client sees the error instead of a reset.
            tracing::warn!("Upload failed: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

fn payload_too_large() -> AppError {
    AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
}

/// The body limit can trip while the file is being staged, surfacing as an I/O error.
fn body_limit_exceeded(err: &std::io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
        .is_some_and(|e| e.status() == StatusCode::PAYLOAD_TOO_LARGE)
}
