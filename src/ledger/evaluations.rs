use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};
use serde::Serialize;

use crate::domain::{Evaluation, EvaluationData};
use crate::error::{EvalError, Result};

use super::{conflict, is_constraint_violation, now_timestamp, parse_timestamp, Ledger};

const SELECT_EVALUATION: &str = "SELECT id, experiment_id, test_paper_id, question_id, test_question, \
     bot_response, question_source, standard_answer, difficulty, accuracy, relevance, logic, \
     conciseness, language_quality, total_score, overall_comment, created_at FROM evaluations";

/// Read filter; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct EvaluationFilter {
    pub experiment_id: Option<String>,
    pub question_id: Option<String>,
    pub source: Option<String>,
}

impl EvaluationFilter {
    pub fn experiment(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = Some(experiment_id.into());
        self
    }

    pub fn question(mut self, question_id: impl Into<String>) -> Self {
        self.question_id = Some(question_id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Outcome of an upsert by question id
#[derive(Debug, Clone)]
pub enum UpsertResult {
    Created(Evaluation),
    Updated(Evaluation),
}

impl UpsertResult {
    /// The stored evaluation regardless of outcome
    pub fn evaluation(&self) -> &Evaluation {
        match self {
            Self::Created(evaluation) | Self::Updated(evaluation) => evaluation,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Per-experiment totals for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSummary {
    pub experiment_id: String,
    pub count: u64,
    pub average_score: f64,
}

fn evaluation_from_row(row: &Row<'_>) -> rusqlite::Result<Evaluation> {
    Ok(Evaluation {
        id: row.get(0)?,
        data: EvaluationData {
            experiment_id: row.get(1)?,
            test_paper_id: row.get(2)?,
            question_id: row.get(3)?,
            test_question: row.get(4)?,
            bot_response: row.get(5)?,
            question_source: row.get(6)?,
            standard_answer: row.get(7)?,
            difficulty: row.get(8)?,
            accuracy: row.get(9)?,
            relevance: row.get(10)?,
            logic: row.get(11)?,
            conciseness: row.get(12)?,
            language_quality: row.get(13)?,
            total_score: row.get(14)?,
            overall_comment: row.get(15)?,
        },
        created_at: parse_timestamp(16, row.get(16)?)?,
    })
}

impl Ledger {
    /// Insert a new evaluation; fails with `Conflict` if the
    /// (experiment, question) pair is already stored
    pub fn create_evaluation(&self, data: &EvaluationData) -> Result<Evaluation> {
        let inserted = self.conn.execute(
            "INSERT INTO evaluations (experiment_id, test_paper_id, question_id, test_question, \
             bot_response, question_source, standard_answer, difficulty, accuracy, relevance, logic, \
             conciseness, language_quality, total_score, overall_comment, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                data.experiment_id,
                data.test_paper_id,
                data.question_id,
                data.test_question,
                data.bot_response,
                data.question_source,
                data.standard_answer,
                data.difficulty,
                data.accuracy,
                data.relevance,
                data.logic,
                data.conciseness,
                data.language_quality,
                data.total_score,
                data.overall_comment,
                now_timestamp(),
            ],
        );

        match inserted {
            Ok(_) => self.evaluation_by_rowid(self.conn.last_insert_rowid()),
            Err(e) if is_constraint_violation(&e) => {
                Err(conflict(&data.experiment_id, &data.question_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the evaluation stored for `question_id` under the target
    /// experiment, or insert one.
    ///
    /// Rows of the same question in other experiments are left alone; the
    /// creation timestamp of a replaced row is kept.
    pub fn upsert_evaluation(&self, question_id: &str, data: &EvaluationData) -> Result<UpsertResult> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM evaluations WHERE experiment_id = ?1 AND question_id = ?2",
                params![data.experiment_id, question_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(id) = existing else {
            let mut data = data.clone();
            data.question_id = question_id.to_string();
            return self.create_evaluation(&data).map(UpsertResult::Created);
        };

        self.conn.execute(
            "UPDATE evaluations SET test_paper_id = ?1, test_question = ?2, bot_response = ?3, \
             question_source = ?4, standard_answer = ?5, difficulty = ?6, accuracy = ?7, \
             relevance = ?8, logic = ?9, conciseness = ?10, language_quality = ?11, \
             total_score = ?12, overall_comment = ?13 WHERE id = ?14",
            params![
                data.test_paper_id,
                data.test_question,
                data.bot_response,
                data.question_source,
                data.standard_answer,
                data.difficulty,
                data.accuracy,
                data.relevance,
                data.logic,
                data.conciseness,
                data.language_quality,
                data.total_score,
                data.overall_comment,
                id,
            ],
        )?;

        self.evaluation_by_rowid(id).map(UpsertResult::Updated)
    }

    /// List evaluations matching `filter`, oldest first
    pub fn list_evaluations(&self, filter: &EvaluationFilter) -> Result<Vec<Evaluation>> {
        let mut clauses = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();

        if let Some(experiment_id) = &filter.experiment_id {
            values.push(experiment_id);
            clauses.push(format!("experiment_id = ?{}", values.len()));
        }
        if let Some(question_id) = &filter.question_id {
            values.push(question_id);
            clauses.push(format!("question_id = ?{}", values.len()));
        }
        if let Some(source) = &filter.source {
            values.push(source);
            clauses.push(format!("question_source = ?{}", values.len()));
        }

        let mut sql = SELECT_EVALUATION.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), evaluation_from_row)?;

        let mut evaluations = Vec::new();
        for row in rows {
            evaluations.push(row?);
        }
        Ok(evaluations)
    }

    /// Latest evaluation stored under `question_id`
    pub fn get_evaluation(&self, question_id: &str) -> Result<Evaluation> {
        self.conn
            .query_row(
                &format!("{} WHERE question_id = ?1 ORDER BY id DESC LIMIT 1", SELECT_EVALUATION),
                [question_id],
                evaluation_from_row,
            )
            .optional()?
            .ok_or_else(|| EvalError::NotFound(format!("evaluation for question '{}'", question_id)))
    }

    /// Whether any evaluation is stored for the experiment
    pub fn experiment_exists(&self, experiment_id: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM evaluations WHERE experiment_id = ?1)",
            [experiment_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Whether the (experiment, question) pair is already stored
    pub fn evaluation_exists(&self, experiment_id: &str, question_id: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM evaluations WHERE experiment_id = ?1 AND question_id = ?2)",
            [experiment_id, question_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Count and average total score per experiment
    pub fn experiment_summaries(&self) -> Result<Vec<ExperimentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT experiment_id, COUNT(*), AVG(total_score) FROM evaluations \
             GROUP BY experiment_id ORDER BY experiment_id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ExperimentSummary {
                experiment_id: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
                average_score: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    fn evaluation_by_rowid(&self, id: i64) -> Result<Evaluation> {
        let evaluation = self.conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_EVALUATION),
            [id],
            evaluation_from_row,
        )?;
        Ok(evaluation)
    }
}
