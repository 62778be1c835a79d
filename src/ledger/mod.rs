//! SQLite-backed evaluation ledger.
//!
//! The ledger is a plain store: it enforces the (experiment, question)
//! uniqueness constraint and nothing else. Rubric validation belongs to the
//! grader and the ingestor.

mod answers;
mod evaluations;
mod papers;
mod schema;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode};

use crate::error::{EvalError, Result};

pub use evaluations::{EvaluationFilter, ExperimentSummary, UpsertResult};
pub use schema::create_schema;

/// Evaluation ledger over a single SQLite connection
#[derive(Debug)]
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Open or create the ledger database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Open a throwaway in-memory ledger
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        create_schema(&conn)?;
        Ok(Ledger { conn })
    }

    /// Run `work` as one unit: committed if it returns `Ok`, rolled back otherwise.
    ///
    /// A failing statement inside `work` that is handled (for example a
    /// per-row conflict) does not undo the other writes.
    pub fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Ledger) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = work(self)?;
        tx.commit()?;
        Ok(value)
    }

    /// Whether `question_id` is used by any paper question or evaluation
    pub fn question_id_taken(&self, question_id: &str) -> Result<bool> {
        let taken = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM test_paper_questions WHERE question_id = ?1)
                 OR EXISTS(SELECT 1 FROM evaluations WHERE question_id = ?1)",
            [question_id],
            |row| row.get(0),
        )?;
        Ok(taken)
    }
}

fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

fn conflict(experiment_id: &str, question_id: &str) -> EvalError {
    EvalError::Conflict {
        experiment_id: experiment_id.to_string(),
        question_id: question_id.to_string(),
    }
}
