pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;

use crate::config::AppConfig;
use crate::services::upload_service::ImageUploadService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::images::upload_image,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::images::UploadImageResponse,
            api::handlers::images::ImageResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "images", description = "Image upload endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub uploads: Arc<ImageUploadService>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let cors = if state.config.allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors.allow_origin(origins)
    };

    // Sits inside the request id layer so every span carries the id.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get(api::middleware::request_id::REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::index::index))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/image",
            post(api::handlers::images::upload_image).layer(
                axum::extract::DefaultBodyLimit::max(
                    state.config.max_file_size + 1024 * 1024, // multipart overhead
                ),
            ),
        )
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(trace_layer)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
