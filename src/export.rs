//! CSV and JSON writers for reports and upload templates.

use std::io::Write;

use chrono::SecondsFormat;
use serde_json::{json, Value};

use crate::domain::{Evaluation, PaperQuestion};
use crate::error::Result;

pub const EVALUATION_COLUMNS: [&str; 15] = [
    "question_id",
    "experiment_id",
    "test_paper_id",
    "test_question",
    "bot_response",
    "question_source",
    "standard_answer",
    "difficulty",
    "accuracy",
    "relevance",
    "logic",
    "conciseness",
    "language_quality",
    "total_score",
    "created_at",
];

pub const PAPER_COLUMNS: [&str; 5] = ["question", "standard_answer", "difficulty", "source", "tags"];

pub const STUDENT_COLUMNS: [&str; 4] = ["question_id", "question", "response", "source"];

const PAPER_TEMPLATE_ROWS: [[&str; 5]; 2] = [
    ["What is the capital of France?", "Paris", "3", "Midterm A", "geography"],
    ["Who wrote Hamlet?", "William Shakespeare", "3", "Midterm A", "literature"],
];

pub fn write_evaluations_csv<W: Write>(writer: W, evaluations: &[Evaluation]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EVALUATION_COLUMNS)?;

    for evaluation in evaluations {
        let data = &evaluation.data;
        out.write_record([
            data.question_id.clone(),
            data.experiment_id.clone(),
            data.test_paper_id.clone(),
            data.test_question.clone(),
            data.bot_response.clone(),
            data.question_source.clone(),
            data.standard_answer.clone(),
            data.difficulty.to_string(),
            data.accuracy.to_string(),
            data.relevance.to_string(),
            data.logic.to_string(),
            data.conciseness.to_string(),
            data.language_quality.to_string(),
            data.total_score.to_string(),
            evaluation
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        ])?;
    }

    out.flush()?;
    Ok(())
}

/// Questions of one paper in the upload format
pub fn write_paper_csv<W: Write>(writer: W, questions: &[PaperQuestion]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(PAPER_COLUMNS)?;

    for question in questions {
        out.write_record([
            question.question.as_str(),
            question.standard_answer.as_str(),
            &question.difficulty.to_string(),
            question.source.as_str(),
            question.tags.as_str(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

/// Blank paper upload with two sample rows
pub fn write_paper_template_csv<W: Write>(writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(PAPER_COLUMNS)?;
    for row in PAPER_TEMPLATE_ROWS {
        out.write_record(row)?;
    }
    out.flush()?;
    Ok(())
}

/// Answer sheet for the given questions with the response column left blank
pub fn write_student_template_csv<W: Write>(writer: W, questions: &[PaperQuestion]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(STUDENT_COLUMNS)?;

    for question in questions {
        out.write_record([
            question.question_id.as_str(),
            question.question.as_str(),
            "",
            question.source.as_str(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

/// JSON answer sheet accepted back by the batch and scored uploads
pub fn student_template_json(questions: &[PaperQuestion]) -> Value {
    Value::Array(
        questions
            .iter()
            .map(|question| {
                json!({
                    "question_id": question.question_id,
                    "question": question.question,
                    "response": "",
                    "source": question.source,
                })
            })
            .collect(),
    )
}
