//! SQLite schema for the evaluation ledger

use rusqlite::{Connection, Result};

const SCHEMA_SQL: &str = r#"
-- Graded answers, at most one per question per experiment
CREATE TABLE IF NOT EXISTS evaluations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    experiment_id TEXT NOT NULL,
    test_paper_id TEXT NOT NULL DEFAULT '',
    question_id TEXT NOT NULL,
    test_question TEXT NOT NULL,
    bot_response TEXT NOT NULL,
    question_source TEXT NOT NULL DEFAULT '',
    standard_answer TEXT NOT NULL,
    difficulty INTEGER NOT NULL DEFAULT 3,
    accuracy INTEGER NOT NULL,
    relevance INTEGER NOT NULL,
    logic INTEGER NOT NULL,
    conciseness INTEGER NOT NULL,
    language_quality INTEGER NOT NULL,
    total_score INTEGER NOT NULL,
    overall_comment TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    UNIQUE (experiment_id, question_id)
);
CREATE INDEX IF NOT EXISTS idx_evaluations_question ON evaluations(question_id);
CREATE INDEX IF NOT EXISTS idx_evaluations_source ON evaluations(question_source);

-- Reference answers by source label
CREATE TABLE IF NOT EXISTS standard_answers (
    source TEXT PRIMARY KEY,
    content TEXT NOT NULL
);

-- Uploaded test papers and their questions
CREATE TABLE IF NOT EXISTS test_papers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS test_paper_questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    paper_id INTEGER NOT NULL REFERENCES test_papers(id) ON DELETE CASCADE,
    question_id TEXT NOT NULL,
    question TEXT NOT NULL,
    standard_answer TEXT NOT NULL DEFAULT '',
    difficulty INTEGER NOT NULL DEFAULT 3,
    source TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_paper_questions_qid ON test_paper_questions(question_id);
"#;

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
