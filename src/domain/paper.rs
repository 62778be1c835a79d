//! Test papers and reference answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named collection of questions with authoritative answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPaper {
    pub id: i64,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A question owned by a test paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperQuestion {
    pub paper_id: i64,
    pub question_id: String,
    pub question: String,
    pub standard_answer: String,
    pub difficulty: u8,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tags: String,
}

/// Reference text keyed by a unique source label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardAnswer {
    pub source: String,
    pub content: String,
}

impl StandardAnswer {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}
