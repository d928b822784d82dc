//! Feedback model, persistence and processing pipeline

pub mod model;
pub mod repository;
pub mod service;

pub use model::{
    FeedbackRecord, FeedbackRequest, NewFeedback, StrategySnapshot, StrategyUpdate,
    ValidationError, GENERAL_TOPIC, MAX_MESSAGE_CHARS,
};
pub use repository::{FeedbackRepository, GatewayFeedbackRepository, RepositoryError};
pub use service::{detect_language, FeedbackError, FeedbackPipeline, FeedbackService};
