use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub remote_storage: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = if state.db.ping().await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    let remote = state.uploads.remote();
    let remote_status = if remote.is_configured() {
        format!("{} (configured)", remote.provider())
    } else {
        format!("{} (missing credentials)", remote.provider())
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database: db_status.to_string(),
        remote_storage: remote_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
