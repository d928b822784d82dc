//! Rule-based feedback classifier
//!
//! Lower-cases the text and looks for substring matches against per-language
//! keyword lists. Hard keywords are checked before easy ones, so a message
//! containing both ("boring, need harder problems") is labelled hard.

use super::types::{Classification, Difficulty, Language};
use std::collections::HashMap;
use thiserror::Error;

/// Classification failure
///
/// The keyword classifier never fails. The variant exists for model-backed
/// implementations.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

/// Maps feedback text to a difficulty label and adjustment
///
/// Implementations must be deterministic for a given input and safe to call
/// from any number of requests at once.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str, language: Language)
        -> Result<Classification, ClassificationError>;
}

/// Keyword lists for one language
#[derive(Debug, Clone, Default)]
struct KeywordSet {
    hard: Vec<String>,
    easy: Vec<String>,
}

const EN_HARD: &[&str] = &[
    "hard",
    "difficult",
    "challenging",
    "tough",
    "complex",
    "confusing",
    "can't solve",
    "too hard",
    "struggle",
];

const EN_EASY: &[&str] = &[
    "easy",
    "simple",
    "too easy",
    "boring",
    "trivial",
    "very easy",
    "super easy",
];

// "непросто" is listed so it wins over the easy keyword "просто" it contains
const RU_HARD: &[&str] = &[
    "сложно",
    "трудно",
    "тяжело",
    "не понимаю",
    "непонятно",
    "непросто",
    "запутанно",
    "не могу решить",
];

const RU_EASY: &[&str] = &["легко", "просто", "слишком легко", "скучно", "элементарно"];

/// Deterministic keyword classifier
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    keywords: HashMap<Language, KeywordSet>,
}

impl KeywordClassifier {
    /// Classifier with the built-in English and Russian keyword sets
    pub fn new() -> Self {
        Self::empty()
            .with_keywords(Language::En, EN_HARD, EN_EASY)
            .with_keywords(Language::Ru, RU_HARD, RU_EASY)
    }

    /// Classifier with no keyword sets; labels everything neutral
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace the keyword set for `language`
    ///
    /// Keywords are stored lower-cased; order is match order.
    pub fn with_keywords(mut self, language: Language, hard: &[&str], easy: &[&str]) -> Self {
        let lower =
            |words: &[&str]| -> Vec<String> { words.iter().map(|w| w.to_lowercase()).collect() };
        self.keywords.insert(
            language,
            KeywordSet {
                hard: lower(hard),
                easy: lower(easy),
            },
        );
        self
    }

    fn label(&self, text: &str, language: Language) -> Difficulty {
        let Some(set) = self.keywords.get(&language) else {
            return Difficulty::Ok;
        };

        let text = text.to_lowercase();
        if set.hard.iter().any(|k| text.contains(k.as_str())) {
            Difficulty::Hard
        } else if set.easy.iter().any(|k| text.contains(k.as_str())) {
            Difficulty::Easy
        } else {
            Difficulty::Ok
        }
    }
}

impl Classifier for KeywordClassifier {
    fn classify(
        &self,
        text: &str,
        language: Language,
    ) -> Result<Classification, ClassificationError> {
        Ok(Classification::from_label(self.label(text, language)))
    }
}
