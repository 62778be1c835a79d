//! evaltrack - Rubric grading of agent answers with an LLM oracle
//!
//! Uploaded answers are graded against reference answers on five
//! dimensions (accuracy, relevance, logic, conciseness, language quality)
//! and recorded in an SQLite evaluation ledger.
//!
//! # Architecture
//!
//! - Every score is well-formed: oracle failures degrade to an all-zero score
//!   with diagnostics instead of aborting a batch
//! - The total is always recomputed from the five sub-scores
//! - Experiment-keyed batches are graded first and committed in one
//!   transaction, so re-submitting a batch never duplicates rows
//!
//! # Modules
//!
//! - `adapters`: Grading oracle interface and the OpenAI-compatible client
//! - `core`: Grader, score aggregation, identifier generation
//! - `domain`: Data structures (RubricScore, Evaluation, TestPaper)
//! - `ingest`: Artifact decoding, reference resolution, batch ingestion
//! - `ledger`: SQLite persistence
//! - `export`: CSV/JSON reports and upload templates
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Store a reference answer and grade one response against it
//! evaltrack answer add Wikipedia --content "Artificial Intelligence"
//! evaltrack evaluate -e exp-1 -q "What is AI?" -r "Machines that think" -s Wikipedia
//!
//! # Grade a whole batch
//! evaltrack upload-batch answers.json --experiment run-2
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod export;
pub mod ingest;
pub mod ledger;

// Re-export main types at crate root for convenience
pub use adapters::{OpenAiOracle, Oracle, OracleOutput};
pub use crate::core::{Grader, IdForm, IdGenerator, RangePolicy};
pub use domain::{
    Evaluation, EvaluationData, EvaluationRequest, PaperQuestion, RubricScore, ScoreRequest,
    StandardAnswer, TestPaper,
};
pub use error::{EvalError, Result};
pub use ingest::{Artifact, IngestReport, Ingestor, ItemOutcome, ReferenceStrategy};
pub use ledger::{EvaluationFilter, Ledger};
