//! Feedback pipeline
//!
//! Per request: resolve language → classify → build snapshot → persist →
//! respond. Nothing is retried here; a failed save aborts the request and
//! retry policy belongs to the caller.

use super::model::{
    FeedbackRecord, FeedbackRequest, NewFeedback, StrategySnapshot, StrategyUpdate, GENERAL_TOPIC,
};
use super::repository::{FeedbackRepository, RepositoryError};
use crate::strategy::{ClassificationError, Classifier, Language};
use async_trait::async_trait;
use mentor_common::{time, CallContext};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Pipeline failure
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("failed to build strategy snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("feedback storage failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// Feedback operations exposed to the HTTP layer
#[async_trait]
pub trait FeedbackService: Send + Sync {
    /// Classify, persist and answer one feedback submission
    async fn process_feedback(
        &self,
        ctx: &CallContext,
        request: &FeedbackRequest,
    ) -> Result<StrategyUpdate, FeedbackError>;

    /// Most recent feedback for a student, newest first
    async fn latest_feedback(
        &self,
        ctx: &CallContext,
        student_id: Uuid,
        limit: u32,
    ) -> Result<Vec<FeedbackRecord>, FeedbackError>;
}

/// The feedback pipeline
///
/// Holds no per-request state; one instance is shared by all requests.
#[derive(Clone)]
pub struct FeedbackPipeline {
    repository: Arc<dyn FeedbackRepository>,
    classifier: Arc<dyn Classifier>,
}

impl FeedbackPipeline {
    pub fn new(repository: Arc<dyn FeedbackRepository>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            repository,
            classifier,
        }
    }
}

#[async_trait]
impl FeedbackService for FeedbackPipeline {
    async fn process_feedback(
        &self,
        ctx: &CallContext,
        request: &FeedbackRequest,
    ) -> Result<StrategyUpdate, FeedbackError> {
        let language = request
            .language
            .unwrap_or_else(|| detect_language(&request.message));

        let classification = self.classifier.classify(&request.message, language)?;

        let snapshot = StrategySnapshot {
            difficulty_weight: 1.0 + classification.adjustment,
            timestamp: time::now().timestamp(),
            feedback_based: true,
            language,
            sentiment: classification.label,
        };

        let feedback = NewFeedback {
            student_id: request.student_id,
            message: request.message.clone(),
            perceived_difficulty: classification.label,
            strategy_snapshot: serde_json::to_value(&snapshot)?,
        };

        let record = self.repository.save(ctx, feedback).await.map_err(|e| {
            error!(
                student_id = %request.student_id,
                retryable = e.is_retryable(),
                error = %e,
                "failed to save feedback"
            );
            e
        })?;

        info!(
            feedback_id = %record.id,
            student_id = %record.student_id,
            language = %language,
            difficulty = %classification.label,
            adjustment = classification.adjustment,
            "feedback saved"
        );

        Ok(StrategyUpdate {
            student_id: record.student_id,
            task_id: request.task_id.clone(),
            difficulty_adjustment: classification.adjustment,
            topic_weights: topic_weights(classification.adjustment),
            sentiment: record.perceived_difficulty,
            strategy_snapshot: record.strategy_snapshot,
            timestamp: time::now(),
        })
    }

    async fn latest_feedback(
        &self,
        ctx: &CallContext,
        student_id: Uuid,
        limit: u32,
    ) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        Ok(self
            .repository
            .get_latest_by_student(ctx, student_id, limit)
            .await?)
    }
}

/// Single-pass script check: any Cyrillic character means Russian
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(is_cyrillic) {
        Language::Ru
    } else {
        Language::DEFAULT
    }
}

fn is_cyrillic(c: char) -> bool {
    matches!(c,
        '\u{0400}'..='\u{04FF}'     // Cyrillic
        | '\u{0500}'..='\u{052F}'   // Cyrillic Supplement
        | '\u{1C80}'..='\u{1C8F}'   // Cyrillic Extended-C
        | '\u{2DE0}'..='\u{2DFF}'   // Cyrillic Extended-A
        | '\u{A640}'..='\u{A69F}'   // Cyrillic Extended-B
    )
}

/// Uniform weights: one "general" topic until topics are classified
fn topic_weights(adjustment: f64) -> BTreeMap<String, f64> {
    BTreeMap::from([(GENERAL_TOPIC.to_string(), 1.0 + adjustment)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Classification, Difficulty, KeywordClassifier};
    use chrono::Utc;
    use mentor_common::db::{BindingError, GatewayError};
    use std::sync::Mutex;

    /// Repository that keeps saved records in memory
    #[derive(Default)]
    struct MemoryRepository {
        saved: Mutex<Vec<NewFeedback>>,
        fail: bool,
    }

    #[async_trait]
    impl FeedbackRepository for MemoryRepository {
        async fn save(
            &self,
            _ctx: &CallContext,
            feedback: NewFeedback,
        ) -> Result<FeedbackRecord, RepositoryError> {
            if self.fail {
                return Err(RepositoryError::Gateway(GatewayError::Unavailable(
                    BindingError::Transport("down".to_string()),
                )));
            }
            self.saved.lock().unwrap().push(feedback.clone());
            Ok(feedback.into_record(Uuid::new_v4(), Utc::now()))
        }

        async fn get_latest_by_student(
            &self,
            _ctx: &CallContext,
            _student_id: Uuid,
            _limit: u32,
        ) -> Result<Vec<FeedbackRecord>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    /// Classifier that always fails
    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn classify(
            &self,
            _text: &str,
            _language: Language,
        ) -> Result<Classification, ClassificationError> {
            Err(ClassificationError::Unavailable("model offline".to_string()))
        }
    }

    fn pipeline(repo: Arc<MemoryRepository>) -> FeedbackPipeline {
        FeedbackPipeline::new(repo, Arc::new(KeywordClassifier::new()))
    }

    fn request(message: &str, language: Option<Language>) -> FeedbackRequest {
        FeedbackRequest {
            student_id: Uuid::new_v4(),
            task_id: "task-42".to_string(),
            message: message.to_string(),
            language,
        }
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("this is hard"), Language::En);
        assert_eq!(detect_language("это сложно"), Language::Ru);
        assert_eq!(detect_language("task 5 is сложно"), Language::Ru);
        assert_eq!(detect_language(""), Language::En);
        assert_eq!(detect_language("très difficile"), Language::En);
    }

    #[test]
    fn test_topic_weights_single_general_entry() {
        let weights = topic_weights(-0.15);
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[GENERAL_TOPIC], 1.0 - 0.15);
    }

    #[tokio::test]
    async fn test_process_feedback_echoes_ids_and_classifies() {
        let repo = Arc::new(MemoryRepository::default());
        let req = request("This is too hard", None);

        let update = pipeline(repo.clone())
            .process_feedback(&CallContext::background(), &req)
            .await
            .unwrap();

        assert_eq!(update.student_id, req.student_id);
        assert_eq!(update.task_id, req.task_id);
        assert_eq!(update.sentiment, Difficulty::Hard);
        assert_eq!(update.difficulty_adjustment, -0.15);
        assert_eq!(update.topic_weights[GENERAL_TOPIC], 1.0 - 0.15);
    }

    #[tokio::test]
    async fn test_snapshot_is_persisted_verbatim() {
        let repo = Arc::new(MemoryRepository::default());
        let update = pipeline(repo.clone())
            .process_feedback(&CallContext::background(), &request("it's boring", None))
            .await
            .unwrap();

        let saved = repo.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].perceived_difficulty, Difficulty::Easy);
        assert_eq!(saved[0].strategy_snapshot, update.strategy_snapshot);

        let snapshot = &saved[0].strategy_snapshot;
        assert_eq!(snapshot["difficulty_weight"], 1.0 + 0.15);
        assert_eq!(snapshot["feedback_based"], true);
        assert_eq!(snapshot["language"], "en");
        assert_eq!(snapshot["sentiment"], "easy");
        assert!(snapshot["timestamp"].as_i64().unwrap() > 1_600_000_000);
    }

    #[tokio::test]
    async fn test_detected_language_drives_classification() {
        let repo = Arc::new(MemoryRepository::default());
        let update = pipeline(repo.clone())
            .process_feedback(&CallContext::background(), &request("очень трудно", None))
            .await
            .unwrap();

        assert_eq!(update.sentiment, Difficulty::Hard);
        assert_eq!(update.strategy_snapshot["language"], "ru");
    }

    #[tokio::test]
    async fn test_caller_language_wins_over_detection() {
        let repo = Arc::new(MemoryRepository::default());
        // English keywords only apply to English; forcing ru makes it neutral
        let update = pipeline(repo.clone())
            .process_feedback(
                &CallContext::background(),
                &request("too hard", Some(Language::Ru)),
            )
            .await
            .unwrap();

        assert_eq!(update.sentiment, Difficulty::Ok);
        assert_eq!(update.difficulty_adjustment, 0.0);
        assert_eq!(update.strategy_snapshot["language"], "ru");
    }

    #[tokio::test]
    async fn test_save_failure_aborts_pipeline() {
        let repo = Arc::new(MemoryRepository {
            fail: true,
            ..Default::default()
        });
        let err = pipeline(repo)
            .process_feedback(&CallContext::background(), &request("fine", None))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::Repository(_)));
    }

    #[tokio::test]
    async fn test_classifier_failure_skips_persistence() {
        let repo = Arc::new(MemoryRepository::default());
        let pipeline = FeedbackPipeline::new(repo.clone(), Arc::new(BrokenClassifier));

        let err = pipeline
            .process_feedback(&CallContext::background(), &request("hard", None))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::Classification(_)));
        assert!(repo.saved.lock().unwrap().is_empty());
    }
}
