//! Short question identifiers.
//!
//! Two forms are in use:
//! - Paper: first 8 hex chars of a random UUIDv4 (test-paper questions)
//! - Short: first 6 hex chars of SHA-256 over a random UUIDv4 (scoring paths)
//!
//! Generation retries until the caller's collision check reports a free id,
//! up to a fixed budget.

use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::error::{EvalError, Result};

/// Default number of draws before giving up
pub const DEFAULT_RETRY_BUDGET: u32 = 1000;

/// Identifier shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdForm {
    /// 8 hex chars taken straight from a UUIDv4
    Paper,

    /// 6 hex chars taken from SHA-256 of a UUIDv4
    Short,
}

impl IdForm {
    /// Number of hex characters in this form
    pub fn hex_len(&self) -> usize {
        match self {
            IdForm::Paper => 8,
            IdForm::Short => 6,
        }
    }

    fn draw(&self) -> String {
        let uuid = Uuid::new_v4();
        match self {
            IdForm::Paper => uuid.simple().to_string()[..self.hex_len()].to_string(),
            IdForm::Short => {
                let digest = Sha256::digest(uuid.to_string().as_bytes());
                hex::encode(digest)[..self.hex_len()].to_string()
            }
        }
    }
}

/// Collision-checked identifier generator
#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    form: IdForm,
    max_attempts: u32,
}

impl IdGenerator {
    pub fn new(form: IdForm) -> Self {
        Self {
            form,
            max_attempts: DEFAULT_RETRY_BUDGET,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Draw ids until `taken` reports one as free
    pub fn generate<F>(&self, taken: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let form = self.form;
        self.generate_from(|| form.draw(), taken)
    }

    fn generate_from<D, F>(&self, mut draw: D, mut taken: F) -> Result<String>
    where
        D: FnMut() -> String,
        F: FnMut(&str) -> Result<bool>,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = draw();
            if !taken(&candidate)? {
                return Ok(candidate);
            }
            debug!(attempt, candidate = %candidate, "Identifier collision, drawing again");
        }

        Err(EvalError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}
