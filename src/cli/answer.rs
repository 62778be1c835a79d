//! Standard-answer CLI subcommands.
//!
//! Provides commands to:
//! - `add`: Store reference text under a source label
//! - `list`: Show stored source labels

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::domain::StandardAnswer;

/// Standard-answer subcommands
#[derive(Subcommand, Debug)]
pub enum AnswerCommands {
    /// Add or replace the reference text for a source label
    Add {
        /// Source label (e.g. "Wikipedia")
        source: String,

        /// Reference text
        #[arg(short, long, conflicts_with = "file")]
        content: Option<String>,

        /// Read reference text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List stored standard answers
    List {
        /// Print full reference text
        #[arg(long)]
        full: bool,
    },
}

pub async fn execute_add(source: &str, content: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let content = match (content, file) {
        (Some(content), _) => content,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read reference file: {}", path.display()))?,
        (None, None) => anyhow::bail!("Provide the reference text with --content or --file"),
    };

    let source = source.trim();
    if source.is_empty() {
        anyhow::bail!("Source label is empty");
    }
    if content.trim().is_empty() {
        anyhow::bail!("Reference text is empty");
    }

    let ledger = super::open_ledger()?;
    ledger.put_standard_answer(&StandardAnswer::new(source, content.trim()))?;

    println!("Stored standard answer for '{}'", source);
    Ok(())
}

pub async fn execute_list(full: bool) -> Result<()> {
    let ledger = super::open_ledger()?;
    let answers = ledger.list_standard_answers()?;

    if answers.is_empty() {
        println!("No standard answers stored");
        return Ok(());
    }

    println!("{:<24} {}", "SOURCE", "CONTENT");
    println!("{}", "-".repeat(75));

    for answer in answers {
        let content = if full {
            answer.content
        } else {
            super::truncate(&answer.content, 50)
        };
        println!("{:<24} {}", answer.source, content);
    }

    Ok(())
}
