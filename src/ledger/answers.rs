use rusqlite::{params, OptionalExtension};

use crate::domain::StandardAnswer;
use crate::error::Result;

use super::Ledger;

impl Ledger {
    /// Store reference text under a source label, replacing any previous text
    pub fn put_standard_answer(&self, answer: &StandardAnswer) -> Result<()> {
        self.conn.execute(
            "INSERT INTO standard_answers (source, content) VALUES (?1, ?2)
             ON CONFLICT(source) DO UPDATE SET content = excluded.content",
            params![answer.source, answer.content],
        )?;
        Ok(())
    }

    pub fn standard_answer(&self, source: &str) -> Result<Option<StandardAnswer>> {
        let answer = self
            .conn
            .query_row(
                "SELECT source, content FROM standard_answers WHERE source = ?1",
                [source],
                |row| {
                    Ok(StandardAnswer {
                        source: row.get(0)?,
                        content: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(answer)
    }

    pub fn list_standard_answers(&self) -> Result<Vec<StandardAnswer>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source, content FROM standard_answers ORDER BY source")?;
        let answers = stmt
            .query_map([], |row| {
                Ok(StandardAnswer {
                    source: row.get(0)?,
                    content: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(answers)
    }
}
