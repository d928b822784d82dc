//! mentor-api library - feedback-driven learning strategy service
//!
//! Classifies student feedback, persists it with a strategy snapshot through
//! the relational gateway, and answers with a strategy update.

use axum::{
    body::Body,
    http::{Request, Uri},
    middleware, Router,
};
use mentor_common::db::SqlGateway;
use mentor_common::CallContext;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod feedback;
pub mod strategy;

use error::ApiError;
use feedback::FeedbackService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Feedback pipeline
    pub feedback: Arc<dyn FeedbackService>,
    /// Gateway used for readiness probes
    pub gateway: Arc<dyn SqlGateway>,
    /// Deadline applied to each request's downstream calls
    pub request_timeout: Duration,
}

impl AppState {
    /// Create new application state
    pub fn new(
        feedback: Arc<dyn FeedbackService>,
        gateway: Arc<dyn SqlGateway>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            feedback,
            gateway,
            request_timeout,
        }
    }

    /// Fresh per-request context bounded by the configured timeout
    pub fn call_context(&self) -> CallContext {
        CallContext::with_timeout(self.request_timeout)
    }
}

/// Build application router
///
/// Every response carries `X-Request-ID`; an incoming one is kept, otherwise a
/// UUID is generated. The trace span records it so log lines correlate.
/// A panicking handler is answered with INTERNAL_ERROR instead of a dropped
/// connection.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::feedback_routes())
        .merge(api::health_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(api::handle_panic))
        .layer(middleware::from_fn(api::log_requests))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
