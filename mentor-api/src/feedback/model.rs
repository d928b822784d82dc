//! Feedback records and request/response DTOs

use crate::strategy::{Difficulty, Language};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Maximum feedback message length, in characters
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Topic key used while topic weights are uniform
pub const GENERAL_TOPIC: &str = "general";

/// Persisted feedback event
///
/// Only the repository constructs these: `id` and `created_at` are assigned by
/// the database on insert and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub message: String,
    pub perceived_difficulty: Difficulty,
    /// Strategy state at write time, stored verbatim
    pub strategy_snapshot: Value,
    pub created_at: DateTime<Utc>,
}

/// Feedback event that has not been persisted yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub student_id: Uuid,
    pub message: String,
    pub perceived_difficulty: Difficulty,
    pub strategy_snapshot: Value,
}

impl NewFeedback {
    /// Attach the identity assigned by the database
    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> FeedbackRecord {
        FeedbackRecord {
            id,
            student_id: self.student_id,
            message: self.message,
            perceived_difficulty: self.perceived_difficulty,
            strategy_snapshot: self.strategy_snapshot,
            created_at,
        }
    }
}

/// Strategy state captured with each feedback event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    /// `1.0 + adjustment`
    pub difficulty_weight: f64,
    /// Unix seconds when the snapshot was generated
    pub timestamp: i64,
    /// Marks snapshots derived from student feedback
    pub feedback_based: bool,
    pub language: Language,
    pub sentiment: Difficulty,
}

/// Inbound "submit feedback" payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub student_id: Uuid,
    pub task_id: String,
    pub message: String,
    /// Detected from the message when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

/// Request rejected before it reaches the pipeline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("message is too long ({chars} characters, maximum {max})")]
    MessageTooLong { chars: usize, max: usize },

    /// PostgreSQL text columns cannot store NUL
    #[error("{0} must not contain NUL characters")]
    ContainsNul(&'static str),
}

impl FeedbackRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task_id.trim().is_empty() {
            return Err(ValidationError::Missing("task_id"));
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::Missing("message"));
        }
        if self.task_id.contains('\0') {
            return Err(ValidationError::ContainsNul("task_id"));
        }
        if self.message.contains('\0') {
            return Err(ValidationError::ContainsNul("message"));
        }
        let chars = self.message.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(ValidationError::MessageTooLong {
                chars,
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(())
    }
}

/// Outbound result of processing feedback; derived, never stored as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyUpdate {
    pub student_id: Uuid,
    pub task_id: String,
    pub difficulty_adjustment: f64,
    pub topic_weights: BTreeMap<String, f64>,
    pub sentiment: Difficulty,
    pub strategy_snapshot: Value,
    pub timestamp: DateTime<Utc>,
}
