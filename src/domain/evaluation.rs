//! Persisted evaluation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::ScoreRequest;
use super::score::RubricScore;

/// Difficulty recorded on every evaluation
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// Comment prefix marking rows whose grading call failed
pub const GRADING_FAILED_PREFIX: &str = "grading failed: ";

/// Writable fields of an evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationData {
    pub experiment_id: String,
    #[serde(default)]
    pub test_paper_id: String,
    pub question_id: String,
    pub test_question: String,
    pub bot_response: String,
    pub question_source: String,
    pub standard_answer: String,
    pub difficulty: u8,
    pub accuracy: u8,
    pub relevance: u8,
    pub logic: u8,
    pub conciseness: u8,
    pub language_quality: u8,
    pub total_score: u8,
    #[serde(default)]
    pub overall_comment: String,
}

impl EvaluationData {
    /// Combine a graded request with its score under an experiment
    pub fn from_scored(
        experiment_id: impl Into<String>,
        request: &ScoreRequest,
        score: &RubricScore,
    ) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            test_paper_id: String::new(),
            question_id: request.question_id.clone(),
            test_question: request.question_text.clone(),
            bot_response: request.bot_response.clone(),
            question_source: request.question_source.clone(),
            standard_answer: request.standard_answer.clone(),
            difficulty: DEFAULT_DIFFICULTY,
            accuracy: score.accuracy,
            relevance: score.relevance,
            logic: score.logic,
            conciseness: score.conciseness,
            language_quality: score.language_quality,
            total_score: score.total_score,
            overall_comment: match &score.error {
                Some(error) => format!("{}{}", GRADING_FAILED_PREFIX, error),
                None => score.overall_comment.clone().unwrap_or_default(),
            },
        }
    }

    /// Whether this row holds the zero fallback score of a failed grading call
    pub fn grading_failed(&self) -> bool {
        self.overall_comment.starts_with(GRADING_FAILED_PREFIX)
    }

    pub fn with_test_paper(mut self, test_paper_id: impl Into<String>) -> Self {
        self.test_paper_id = test_paper_id.into();
        self
    }
}

/// An evaluation as stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Ledger row id
    pub id: i64,

    #[serde(flatten)]
    pub data: EvaluationData,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scored_copies_rubric() {
        let request = ScoreRequest::new("q1", "What is AI?", "Machines thinking", "Artificial Intelligence")
            .with_source_label("Wikipedia");
        let score = RubricScore::graded([4, 4, 3, 5, 4], Some("solid".to_string()));

        let data = EvaluationData::from_scored("exp-1", &request, &score).with_test_paper("7");

        assert_eq!(data.experiment_id, "exp-1");
        assert_eq!(data.test_paper_id, "7");
        assert_eq!(data.question_source, "Wikipedia");
        assert_eq!(data.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(data.total_score, 20);
        assert_eq!(data.overall_comment, "solid");
    }

    #[test]
    fn test_fallback_records_grading_error() {
        let request = ScoreRequest::new("q1", "Q", "A", "R");
        let data = EvaluationData::from_scored("exp", &request, &RubricScore::fallback("bad", "raw"));
        assert_eq!(data.total_score, 0);
        assert_eq!(data.overall_comment, "grading failed: bad");
        assert!(data.grading_failed());
    }

    #[test]
    fn test_ungraded_row_is_not_a_failure() {
        let request = ScoreRequest::new("q1", "Q", "", "R");
        let data = EvaluationData::from_scored("exp", &request, &RubricScore::ungraded());
        assert_eq!(data.overall_comment, "");
        assert!(!data.grading_failed());
    }
}
