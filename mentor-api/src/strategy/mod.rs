//! Feedback classification
//!
//! The classifier is a capability behind the [`Classifier`] trait. The
//! rule-based [`KeywordClassifier`] is the only implementation today; a learned
//! model must keep the same contract (three labels, adjustment within
//! ±[`ADJUSTMENT_STEP`]).

pub mod analyzer;
pub mod types;

pub use analyzer::{ClassificationError, Classifier, KeywordClassifier};
pub use types::{Classification, Difficulty, Language, ADJUSTMENT_STEP};
