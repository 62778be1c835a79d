//! Error taxonomy for grading and ingestion.
//!
//! Errors fall into two groups:
//! - Item-level: recovered by the ingestor, logged, and reported per item
//! - Batch-level: abort the enclosing batch before anything is persisted

use thiserror::Error;

/// Errors raised by the ledger, the ingestor and the identifier generator
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unsupported artifact format: {0} (expected .json or .csv)")]
    UnsupportedFormat(String),

    #[error("experiment '{0}' already has evaluations; batch rejected")]
    DuplicateExperiment(String),

    #[error("no reference answer found for {0}")]
    MissingReference(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("grading fell back to a zero score: {0}")]
    OracleParseFailure(String),

    #[error("no free identifier found after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("evaluation already exists for experiment '{experiment_id}', question '{question_id}'")]
    Conflict {
        experiment_id: String,
        question_id: String,
    },

    #[error("malformed item: {0}")]
    MalformedItem(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EvalError {
    /// Whether this error only affects the item it was raised for.
    ///
    /// Item-level errors are recorded in the ingest report and the batch
    /// continues with the next item.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            EvalError::MissingReference(_)
                | EvalError::MissingRequiredField(_)
                | EvalError::OracleParseFailure(_)
                | EvalError::GenerationExhausted { .. }
                | EvalError::Conflict { .. }
                | EvalError::MalformedItem(_)
        )
    }

    /// Short machine-readable identifier for reports
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::UnsupportedFormat(_) => "unsupported_format",
            EvalError::DuplicateExperiment(_) => "duplicate_experiment",
            EvalError::MissingReference(_) => "missing_reference",
            EvalError::MissingRequiredField(_) => "missing_required_field",
            EvalError::OracleParseFailure(_) => "oracle_parse_failure",
            EvalError::GenerationExhausted { .. } => "generation_exhausted",
            EvalError::Conflict { .. } => "conflict",
            EvalError::MalformedItem(_) => "malformed_item",
            EvalError::NotFound(_) => "not_found",
            EvalError::Database(_) => "database_error",
            EvalError::Io(_) => "io_error",
            EvalError::Json(_) => "json_error",
            EvalError::Csv(_) => "csv_error",
        }
    }
}

/// Result alias for ledger and ingestion operations
pub type Result<T> = std::result::Result<T, EvalError>;
