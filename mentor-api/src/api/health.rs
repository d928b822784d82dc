//! Health check endpoints
//!
//! Startup and liveness never touch the database. Readiness pings the gateway
//! with the plain connectivity probe, not the row-decoding query path.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Module name reported by liveness
pub const MODULE_NAME: &str = "mentor-api";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Liveness response: status, module name, and version
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health/startup
pub async fn startup() -> Json<StatusResponse> {
    Json(StatusResponse { status: "started" })
}

/// GET /health/liveness
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: MODULE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health/ready
///
/// 503 while the database binding cannot be reached.
pub async fn ready(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let ctx = state.call_context();
    match state.gateway.ping(&ctx).await {
        Ok(()) => Ok(Json(StatusResponse { status: "ready" })),
        Err(e) => {
            warn!(error = %e, "readiness check failed");
            Err(ApiError::ServiceUnavailable(
                "database binding is not reachable".to_string(),
            ))
        }
    }
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health/startup", get(startup))
        .route("/health/liveness", get(liveness))
        .route("/health/ready", get(ready))
}
