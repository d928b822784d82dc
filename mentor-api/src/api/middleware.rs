//! Request logging and panic recovery
//!
//! One log line per request with status, latency and request id. The level
//! follows the status class; successful probe requests are not logged.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::error::{ApiError, INTERNAL_MESSAGE};

/// Path prefixes only logged when the request fails
const QUIET_PREFIXES: &[&str] = &["/health/", "/dapr/"];

/// Log every request once it has been answered
pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    let status = response.status();
    if !is_failure(status) && is_quiet_path(&path) {
        return response;
    }

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    if status.is_server_error() {
        error!(status = status.as_u16(), %method, %path, %query, latency_ms, %request_id, "request");
    } else if status.is_client_error() {
        warn!(status = status.as_u16(), %method, %path, %query, latency_ms, %request_id, "request");
    } else {
        info!(status = status.as_u16(), %method, %path, %query, latency_ms, %request_id, "request");
    }

    response
}

fn is_failure(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

fn is_quiet_path(path: &str) -> bool {
    QUIET_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Turn a handler panic into a logged INTERNAL_ERROR response
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!(panic = %detail, "panic recovered");

    ApiError::Internal(INTERNAL_MESSAGE.to_string()).into_response()
}
