//! Feedback persistence
//!
//! The only place that knows the feedback SQL and how a gateway row maps onto
//! a [`FeedbackRecord`].

use super::model::{FeedbackRecord, NewFeedback};
use crate::strategy::Difficulty;
use async_trait::async_trait;
use mentor_common::db::{row, GatewayError, Row, RowError, SqlGateway};
use mentor_common::CallContext;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const INSERT_FEEDBACK: &str = r#"
    INSERT INTO feedback (student_id, message, perceived_difficulty, strategy_snapshot)
    VALUES ($1::uuid, $2, $3, $4::jsonb)
    RETURNING id, created_at"#;

const SELECT_LATEST_BY_STUDENT: &str = r#"
    SELECT id, student_id, message, perceived_difficulty, strategy_snapshot, created_at
    FROM feedback
    WHERE student_id = $1::uuid
    ORDER BY created_at DESC
    LIMIT $2"#;

/// Repository failure
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Gateway failure (unavailable, protocol decode, cancelled, timed out)
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A row did not match the feedback row shape
    #[error("failed to decode feedback row: {0}")]
    Decode(#[from] RowError),

    /// The write went through the transport but returned no identity
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RepositoryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::Gateway(e) if e.is_retryable())
    }
}

/// Feedback storage
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Insert `feedback` and return it with its database-assigned identity
    async fn save(
        &self,
        ctx: &CallContext,
        feedback: NewFeedback,
    ) -> Result<FeedbackRecord, RepositoryError>;

    /// Most recent records for a student, newest first
    ///
    /// A single malformed row fails the whole call; no partial lists.
    async fn get_latest_by_student(
        &self,
        ctx: &CallContext,
        student_id: Uuid,
        limit: u32,
    ) -> Result<Vec<FeedbackRecord>, RepositoryError>;
}

/// [`FeedbackRepository`] on top of a [`SqlGateway`]
#[derive(Clone)]
pub struct GatewayFeedbackRepository {
    gateway: Arc<dyn SqlGateway>,
}

impl GatewayFeedbackRepository {
    pub fn new(gateway: Arc<dyn SqlGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl FeedbackRepository for GatewayFeedbackRepository {
    async fn save(
        &self,
        ctx: &CallContext,
        feedback: NewFeedback,
    ) -> Result<FeedbackRecord, RepositoryError> {
        let params = [
            json!(feedback.student_id.to_string()),
            json!(feedback.message),
            json!(feedback.perceived_difficulty.as_str()),
            // Sent as text and cast server-side; only scalars cross the binding
            Value::String(feedback.strategy_snapshot.to_string()),
        ];

        let rows = self.gateway.query(ctx, INSERT_FEEDBACK, &params).await?;
        let returned = match rows.as_slice() {
            [row] => row,
            [] => {
                return Err(RepositoryError::Persistence(
                    "insert returned no rows; id and created_at were not assigned".to_string(),
                ))
            }
            more => {
                return Err(RepositoryError::Persistence(format!(
                    "insert returned {} rows, expected exactly one",
                    more.len()
                )))
            }
        };

        let id = row::get_uuid(returned, "id")?;
        let created_at = row::get_timestamp(returned, "created_at")?;
        debug!(feedback_id = %id, "feedback row inserted");

        Ok(feedback.into_record(id, created_at))
    }

    async fn get_latest_by_student(
        &self,
        ctx: &CallContext,
        student_id: Uuid,
        limit: u32,
    ) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let params = [json!(student_id.to_string()), json!(limit)];
        let rows = self
            .gateway
            .query(ctx, SELECT_LATEST_BY_STUDENT, &params)
            .await?;

        let mut records = rows
            .iter()
            .map(decode_feedback_row)
            .collect::<Result<Vec<_>, _>>()?;
        // json_agg does not guarantee the CTE's ORDER BY survives aggregation
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(student_id = %student_id, count = records.len(), "feedback loaded");
        Ok(records)
    }
}

/// Decode a full feedback row
fn decode_feedback_row(r: &Row) -> Result<FeedbackRecord, RowError> {
    let perceived_difficulty = row::get_str(r, "perceived_difficulty")?
        .parse::<Difficulty>()
        .map_err(|e| RowError::new("perceived_difficulty", e))?;

    Ok(FeedbackRecord {
        id: row::get_uuid(r, "id")?,
        student_id: row::get_uuid(r, "student_id")?,
        message: row::get_str(r, "message")?.to_string(),
        perceived_difficulty,
        strategy_snapshot: row::get_json(r, "strategy_snapshot")?,
        created_at: row::get_timestamp(r, "created_at")?,
    })
}
