//! Transient grading request.

use serde::{Deserialize, Serialize};

/// One item to grade, built per ingested row and consumed by the grader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub question_id: String,
    pub question_text: String,
    pub bot_response: String,

    /// Reference answer the response is graded against
    pub standard_answer: String,

    /// Label of the reference source that was used
    #[serde(default)]
    pub question_source: String,

    /// Auxiliary material the response must not contradict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supporting_source: Option<String>,
}

impl ScoreRequest {
    pub fn new(
        question_id: impl Into<String>,
        question_text: impl Into<String>,
        bot_response: impl Into<String>,
        standard_answer: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_text: question_text.into(),
            bot_response: bot_response.into(),
            standard_answer: standard_answer.into(),
            question_source: String::new(),
            supporting_source: None,
        }
    }

    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.question_source = label.into();
        self
    }

    /// Attach supporting material; blank text is ignored
    pub fn with_supporting_source(mut self, source: Option<String>) -> Self {
        self.supporting_source = source.filter(|s| !s.trim().is_empty());
        self
    }

    /// Whether there is an answer to grade
    pub fn has_response(&self) -> bool {
        !self.bot_response.trim().is_empty()
    }
}

/// Single-item scoring request as submitted by an operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub experiment_id: String,

    /// Generated when absent
    #[serde(default)]
    pub question_id: Option<String>,

    pub question: String,
    pub response: String,

    /// StandardAnswer label the response is graded against
    pub source: String,
}

impl EvaluationRequest {
    pub fn new(
        experiment_id: impl Into<String>,
        question: impl Into<String>,
        response: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            question_id: None,
            question: question.into(),
            response: response.into(),
            source: source.into(),
        }
    }

    pub fn with_question_id(mut self, question_id: impl Into<String>) -> Self {
        self.question_id = Some(question_id.into());
        self
    }
}
