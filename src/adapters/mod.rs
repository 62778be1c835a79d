//! Adapter interfaces for the external grading oracle.
//!
//! The grader only depends on the `Oracle` trait, so tests can plug in a
//! scripted oracle instead of a network client.

pub mod openai;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

// Re-export the OpenAI-compatible adapter
pub use openai::OpenAiOracle;

/// Output from one oracle call
#[derive(Debug, Clone)]
pub struct OracleOutput {
    /// Raw text returned by the model
    pub content: String,

    /// Tokens used (if reported)
    pub tokens_used: Option<u64>,
}

impl OracleOutput {
    /// Create an output with just content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens_used: None,
        }
    }
}

/// Trait for grading oracles
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Human-readable oracle name
    fn name(&self) -> &str;

    /// Send one system + user prompt pair and return the raw reply
    async fn complete(&self, system: &str, prompt: &str, timeout: Duration) -> Result<OracleOutput>;

    /// Health check (for HTTP oracles)
    async fn health_check(&self) -> Result<()>;
}
