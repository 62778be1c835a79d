use rusqlite::{params, OptionalExtension, Row};

use crate::domain::{PaperQuestion, TestPaper};
use crate::error::{EvalError, Result};

use super::{now_timestamp, parse_timestamp, Ledger};

const SELECT_QUESTION: &str = "SELECT paper_id, question_id, question, standard_answer, difficulty, \
     source, tags FROM test_paper_questions";

fn paper_from_row(row: &Row<'_>) -> rusqlite::Result<TestPaper> {
    Ok(TestPaper {
        id: row.get(0)?,
        name: row.get(1)?,
        uploaded_at: parse_timestamp(2, row.get(2)?)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<PaperQuestion> {
    Ok(PaperQuestion {
        paper_id: row.get(0)?,
        question_id: row.get(1)?,
        question: row.get(2)?,
        standard_answer: row.get(3)?,
        difficulty: row.get(4)?,
        source: row.get(5)?,
        tags: row.get(6)?,
    })
}

impl Ledger {
    pub fn create_test_paper(&self, name: &str) -> Result<TestPaper> {
        self.conn.execute(
            "INSERT INTO test_papers (name, uploaded_at) VALUES (?1, ?2)",
            params![name, now_timestamp()],
        )?;
        self.test_paper(self.conn.last_insert_rowid())
    }

    /// Attach a question to its paper (`question.paper_id`)
    pub fn add_paper_question(&self, question: &PaperQuestion) -> Result<()> {
        self.conn.execute(
            "INSERT INTO test_paper_questions \
             (paper_id, question_id, question, standard_answer, difficulty, source, tags) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                question.paper_id,
                question.question_id,
                question.question,
                question.standard_answer,
                question.difficulty,
                question.source,
                question.tags,
            ],
        )?;
        Ok(())
    }

    pub fn test_paper(&self, id: i64) -> Result<TestPaper> {
        self.conn
            .query_row(
                "SELECT id, name, uploaded_at FROM test_papers WHERE id = ?1",
                [id],
                paper_from_row,
            )
            .optional()?
            .ok_or_else(|| EvalError::NotFound(format!("test paper {}", id)))
    }

    /// All papers, newest first
    pub fn list_test_papers(&self) -> Result<Vec<TestPaper>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, uploaded_at FROM test_papers ORDER BY id DESC")?;
        let papers = stmt
            .query_map([], paper_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(papers)
    }

    /// Questions of one paper in upload order
    pub fn paper_questions(&self, paper_id: i64) -> Result<Vec<PaperQuestion>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE paper_id = ?1 ORDER BY id ASC", SELECT_QUESTION))?;
        let questions = stmt
            .query_map([paper_id], question_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(questions)
    }

    /// Most recently uploaded paper question with this id
    pub fn find_paper_question(&self, question_id: &str) -> Result<Option<PaperQuestion>> {
        let question = self
            .conn
            .query_row(
                &format!("{} WHERE question_id = ?1 ORDER BY id DESC LIMIT 1", SELECT_QUESTION),
                [question_id],
                question_from_row,
            )
            .optional()?;
        Ok(question)
    }
}
