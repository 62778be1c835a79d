//! Domain types for rubric grading.
//!
//! This module contains the core data structures:
//! - Score: the five-dimension rubric result
//! - Request: one transient grading request
//! - Evaluation: a persisted ledger record
//! - Paper: test papers, their questions and standard answers

pub mod evaluation;
pub mod paper;
pub mod request;
pub mod score;

// Re-export commonly used types
pub use evaluation::{Evaluation, EvaluationData, DEFAULT_DIFFICULTY, GRADING_FAILED_PREFIX};
pub use paper::{PaperQuestion, StandardAnswer, TestPaper};
pub use request::{EvaluationRequest, ScoreRequest};
pub use score::{Dimension, RubricScore};
