//! Shared test fixtures: a scripted in-process oracle.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use evaltrack::adapters::{Oracle, OracleOutput};
use evaltrack::core::Grader;

/// Reply for a perfect-but-for-conciseness answer; its stated total is wrong on purpose
pub const GOOD_REPLY: &str = r#"{"accuracy": 5, "relevance": 5, "logic": 4, "conciseness": 3, "language_quality": 4, "total_score": 25, "overall_comment": "Accurate and well argued"}"#;

/// Oracle that replays queued replies, then repeats a default, recording prompts
pub struct ScriptedOracle {
    queue: Mutex<VecDeque<Result<String, String>>>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(default_reply: &str) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            default_reply: default_reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Queue replies served before the default
    pub fn with_replies(default_reply: &str, replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        let queue = replies
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        Arc::new(Self {
            queue: Mutex::new(queue),
            default_reply: default_reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _system: &str,
        prompt: &str,
        _timeout: Duration,
    ) -> anyhow::Result<OracleOutput> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(OracleOutput::new(reply)),
            Some(Err(error)) => Err(anyhow::anyhow!(error)),
            None => Ok(OracleOutput::new(self.default_reply.clone())),
        }
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn grader(oracle: &Arc<ScriptedOracle>) -> Grader {
    Grader::new(oracle.clone())
}
