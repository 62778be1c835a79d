//! Reference-answer resolution.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::ledger::Ledger;

use super::artifact::BatchItem;

/// Where an item's reference answer comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStrategy {
    /// The uploaded test-paper question with the same question id
    PaperQuestion,

    /// StandardAnswer by source label, falling back to embedded content
    #[default]
    SourceLabel,

    /// Only what the item itself carries
    Embedded,
}

impl std::str::FromStr for ReferenceStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "paper" | "paper_question" => Ok(ReferenceStrategy::PaperQuestion),
            "source" | "source_label" => Ok(ReferenceStrategy::SourceLabel),
            "embedded" => Ok(ReferenceStrategy::Embedded),
            other => Err(format!(
                "unknown reference strategy '{}' (expected paper, source or embedded)",
                other
            )),
        }
    }
}

/// A resolved reference answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub standard_answer: String,

    /// Label recorded as `question_source`
    pub source_label: String,

    /// Embedded material passed to the oracle alongside a looked-up reference
    pub supporting_source: Option<String>,

    /// Owning paper and its declared difficulty, for paper lookups
    pub paper: Option<(i64, u8)>,
}

impl ReferenceStrategy {
    /// Resolve the reference for `item`, or fail with `MissingReference`
    pub fn resolve(&self, ledger: &Ledger, item: &BatchItem) -> Result<Reference> {
        let label = item.source_label().unwrap_or_default().to_string();

        match self {
            ReferenceStrategy::PaperQuestion => {
                let question_id = item
                    .question_id
                    .as_deref()
                    .ok_or(EvalError::MissingRequiredField("question_id"))?;

                let question = ledger
                    .find_paper_question(question_id)?
                    .filter(|q| !q.standard_answer.trim().is_empty())
                    .ok_or_else(|| {
                        EvalError::MissingReference(format!("paper question '{}'", question_id))
                    })?;

                Ok(Reference {
                    standard_answer: question.standard_answer,
                    source_label: if question.source.is_empty() { label } else { question.source },
                    supporting_source: item.embedded_content().map(str::to_string),
                    paper: Some((question.paper_id, question.difficulty)),
                })
            }

            ReferenceStrategy::SourceLabel => {
                if !label.is_empty() {
                    if let Some(answer) = ledger.standard_answer(&label)? {
                        return Ok(Reference {
                            standard_answer: answer.content,
                            source_label: label,
                            supporting_source: item.embedded_content().map(str::to_string),
                            paper: None,
                        });
                    }
                }

                embedded(item, label)
            }

            ReferenceStrategy::Embedded => embedded(item, label),
        }
    }
}

fn embedded(item: &BatchItem, label: String) -> Result<Reference> {
    let standard_answer = item.embedded_reference().ok_or_else(|| {
        if label.is_empty() {
            EvalError::MissingReference("item without sources".to_string())
        } else {
            EvalError::MissingReference(format!("source '{}'", label))
        }
    })?;

    Ok(Reference {
        standard_answer: standard_answer.to_string(),
        source_label: label,
        supporting_source: None,
        paper: None,
    })
}
