//! Labels and languages shared by the classifier and the feedback pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Magnitude of the difficulty adjustment for a non-neutral label
pub const ADJUSTMENT_STEP: f64 = 0.15;

/// Perceived difficulty: the closed label set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Hard,
    Ok,
    Easy,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Hard => "hard",
            Difficulty::Ok => "ok",
            Difficulty::Easy => "easy",
        }
    }

    /// Fixed adjustment for this label: make it easier, keep, or make it harder
    pub fn adjustment(&self) -> f64 {
        match self {
            Difficulty::Hard => -ADJUSTMENT_STEP,
            Difficulty::Ok => 0.0,
            Difficulty::Easy => ADJUSTMENT_STEP,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hard" => Ok(Difficulty::Hard),
            "ok" => Ok(Difficulty::Ok),
            "easy" => Ok(Difficulty::Easy),
            other => Err(format!("unknown difficulty label: {:?}", other)),
        }
    }
}

/// Feedback language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ru,
}

impl Language {
    /// Used when nothing in the text points elsewhere
    pub const DEFAULT: Language = Language::En;

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: Difficulty,
    /// Always within `[-ADJUSTMENT_STEP, ADJUSTMENT_STEP]`
    pub adjustment: f64,
}

impl Classification {
    pub fn from_label(label: Difficulty) -> Self {
        Self {
            label,
            adjustment: label.adjustment(),
        }
    }

    pub fn neutral() -> Self {
        Self::from_label(Difficulty::Ok)
    }
}
