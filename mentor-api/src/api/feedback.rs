//! Feedback endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use mentor_common::uuid_utils;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::feedback::{FeedbackRecord, FeedbackRequest, StrategyUpdate};
use crate::AppState;

/// Records returned when no limit is given
pub const DEFAULT_LIMIT: u32 = 10;

/// Upper bound on records per request
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct LatestQuery {
    pub limit: Option<u32>,
}

impl LatestQuery {
    /// Requested limit clamped to 1..=MAX_LIMIT
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct LatestFeedbackResponse {
    pub student_id: Uuid,
    pub limit: u32,
    pub feedback: Vec<FeedbackRecord>,
}

/// POST /api/v1/feedback
///
/// Malformed bodies are rejected as INVALID_REQUEST rather than axum's default
/// 415/422 so callers see a single error shape.
pub async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult<Json<StrategyUpdate>> {
    let Json(request) = payload?;
    request.validate()?;

    let ctx = state.call_context();
    let update = state.feedback.process_feedback(&ctx, &request).await?;
    Ok(Json(update))
}

/// GET /api/v1/students/:student_id/feedback?limit=N
pub async fn latest_feedback(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<LatestQuery>, QueryRejection>,
) -> ApiResult<Json<LatestFeedbackResponse>> {
    let Path(raw_id) = path?;
    let Query(query) = query?;

    let student_id = uuid_utils::parse_canonical(&raw_id)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid student_id: {}", raw_id)))?;
    let limit = query.effective_limit();

    let ctx = state.call_context();
    let feedback = state
        .feedback
        .latest_feedback(&ctx, student_id, limit)
        .await?;

    Ok(Json(LatestFeedbackResponse {
        student_id,
        limit,
        feedback,
    }))
}

/// Build feedback routes
pub fn feedback_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/feedback", post(submit_feedback))
        .route("/api/v1/students/:student_id/feedback", get(latest_feedback))
}
