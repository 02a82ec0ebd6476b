use axum::{
    extract::{MatchedPath, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

use super::request_id::REQUEST_ID_HEADER;

const UPLOAD_ROUTE: &str = "/api/image";

/// What a finished request amounts to, as reported in the `metrics` log target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    ImageStored,
    UploadRejected,
    UploadFailed,
    Served,
    ClientError,
    ServerError,
}

impl RequestOutcome {
    pub fn classify(method: &Method, route: &str, status: StatusCode) -> Self {
        let is_upload = method == Method::POST && route == UPLOAD_ROUTE;
        match (is_upload, status) {
            (true, s) if s.is_success() => Self::ImageStored,
            (true, s) if s.is_client_error() => Self::UploadRejected,
            (true, _) => Self::UploadFailed,
            (false, s) if s.is_server_error() => Self::ServerError,
            (false, s) if s.is_client_error() => Self::ClientError,
            (false, _) => Self::Served,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImageStored => "image_stored",
            Self::UploadRejected => "upload_rejected",
            Self::UploadFailed => "upload_failed",
            Self::Served => "served",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
        }
    }
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    // Templated route keeps cardinality low; unmatched requests share one bucket.
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis();
    let status = response.status();
    let outcome = RequestOutcome::classify(&method, &route, status);

    match outcome {
        RequestOutcome::UploadFailed | RequestOutcome::ServerError => warn!(
            target: "metrics",
            method = %method,
            route = %route,
            status = status.as_u16(),
            outcome = outcome.as_str(),
            request_id = %request_id,
            latency_ms = %latency_ms,
            "request_completed"
        ),
        _ => info!(
            target: "metrics",
            method = %method,
            route = %route,
            status = status.as_u16(),
            outcome = outcome.as_str(),
            request_id = %request_id,
            latency_ms = %latency_ms,
            "request_completed"
        ),
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_outcomes() {
        let post = Method::POST;
        assert_eq!(
            RequestOutcome::classify(&post, "/api/image", StatusCode::OK),
            RequestOutcome::ImageStored
        );
        assert_eq!(
            RequestOutcome::classify(&post, "/api/image", StatusCode::PAYLOAD_TOO_LARGE),
            RequestOutcome::UploadRejected
        );
        assert_eq!(
            RequestOutcome::classify(&post, "/api/image", StatusCode::INTERNAL_SERVER_ERROR),
            RequestOutcome::UploadFailed
        );
    }

    #[test]
    fn test_other_routes_are_bucketed_by_status() {
        assert_eq!(
            RequestOutcome::classify(&Method::GET, "/health", StatusCode::OK),
            RequestOutcome::Served
        );
        assert_eq!(
            RequestOutcome::classify(&Method::GET, "unmatched", StatusCode::NOT_FOUND),
            RequestOutcome::ClientError
        );
        // Only POST counts as an upload attempt.
        assert_eq!(
            RequestOutcome::classify(&Method::GET, "/api/image", StatusCode::METHOD_NOT_ALLOWED),
            RequestOutcome::ClientError
        );
        assert_eq!(RequestOutcome::ServerError.as_str(), "server_error");
    }
}
