//! Rubric score value object.
//!
//! A score is either graded (five sub-scores in [1,5] and their sum) or a
//! fallback (all zeros, carrying the failure and the raw oracle output).

use serde::{Deserialize, Serialize};

use crate::core::aggregator;

/// One of the five rubric dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Accuracy,
    Relevance,
    Logic,
    Conciseness,
    LanguageQuality,
}

impl Dimension {
    /// All dimensions in rubric order
    pub const ALL: [Dimension; 5] = [
        Dimension::Accuracy,
        Dimension::Relevance,
        Dimension::Logic,
        Dimension::Conciseness,
        Dimension::LanguageQuality,
    ];

    /// JSON key used in the oracle contract and the ledger columns
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Accuracy => "accuracy",
            Dimension::Relevance => "relevance",
            Dimension::Logic => "logic",
            Dimension::Conciseness => "conciseness",
            Dimension::LanguageQuality => "language_quality",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Five-dimension rubric result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricScore {
    pub accuracy: u8,
    pub relevance: u8,
    pub logic: u8,
    pub conciseness: u8,
    pub language_quality: u8,

    /// Always the sum of the five sub-scores
    pub total_score: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_comment: Option<String>,

    /// Failure description (fallback scores only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Untouched oracle output (fallback scores only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl RubricScore {
    /// Build a graded score; the total is recomputed from the sub-scores
    pub fn graded(sub_scores: [u8; 5], overall_comment: Option<String>) -> Self {
        let [accuracy, relevance, logic, conciseness, language_quality] = sub_scores;
        Self {
            accuracy,
            relevance,
            logic,
            conciseness,
            language_quality,
            total_score: aggregator::total(&sub_scores),
            overall_comment,
            error: None,
            raw_response: None,
        }
    }

    /// All-zero score recording why grading failed
    pub fn fallback(error: impl Into<String>, raw_response: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            raw_response: Some(raw_response.into()),
            ..Self::default()
        }
    }

    /// All-zero score for an item that has not been answered yet
    pub fn ungraded() -> Self {
        Self::default()
    }

    /// Whether this score is the failure fallback
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Sub-scores in rubric order
    pub fn sub_scores(&self) -> [u8; 5] {
        [
            self.accuracy,
            self.relevance,
            self.logic,
            self.conciseness,
            self.language_quality,
        ]
    }

    /// Sub-score for a single dimension
    pub fn get(&self, dimension: Dimension) -> u8 {
        match dimension {
            Dimension::Accuracy => self.accuracy,
            Dimension::Relevance => self.relevance,
            Dimension::Logic => self.logic,
            Dimension::Conciseness => self.conciseness,
            Dimension::LanguageQuality => self.language_quality,
        }
    }
}
