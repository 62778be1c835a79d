//! OpenAI-compatible chat completions oracle.
//!
//! Endpoint: POST {base_url}/chat/completions
//! Auth: Bearer token

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{Oracle, OracleOutput};
use crate::config::OracleSettings;

/// Chat completions client with deterministic sampling
pub struct OpenAiOracle {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

/// Response envelope from the chat completions endpoint
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: Option<u64>,
}

impl OpenAiOracle {
    /// Create a new client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved settings, reading the API key from the environment
    pub fn from_settings(settings: &OracleSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .with_context(|| format!("{} environment variable required", settings.api_key_env))?;
        Ok(Self::new(&settings.base_url, api_key, &settings.model))
    }

    /// Model used for grading
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, prompt: &str, timeout: Duration) -> Result<OracleOutput> {
        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": prompt },
                ],
                "temperature": 0,
            }))
            .send()
            .await
            .context("Failed to send grading request")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Oracle error ({}): {}", status, text.trim());
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completions response")?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("Chat completions response contained no message content")?;

        Ok(OracleOutput {
            content,
            tokens_used: body.usage.and_then(|u| u.total_tokens),
        })
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(self.api_url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to reach oracle")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Oracle health check failed ({}): {}", status, text.trim());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_api_url_trims_trailing_slash() {
        let oracle = OpenAiOracle::new("https://api.example.com/v1/", "KEY", "gpt-4.1-nano");
        assert_eq!(
            oracle.api_url("chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(oracle.name(), "openai");
        assert_eq!(oracle.model(), "gpt-4.1-nano");
    }

    #[tokio::test]
    async fn test_complete_sends_zero_temperature() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("KEY"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4.1-nano",
                "temperature": 0,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"accuracy\": 5}" } }],
                "usage": { "total_tokens": 42 },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = OpenAiOracle::new(format!("{}/v1", server.uri()), "KEY", "gpt-4.1-nano");
        let output = oracle
            .complete("system", "prompt", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output.content, "{\"accuracy\": 5}");
        assert_eq!(output.tokens_used, Some(42));
    }

    #[tokio::test]
    async fn test_complete_surfaces_http_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let oracle = OpenAiOracle::new(format!("{}/v1", server.uri()), "KEY", "gpt-4.1-nano");
        let err = oracle
            .complete("system", "prompt", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let oracle = OpenAiOracle::new(format!("{}/v1", server.uri()), "KEY", "gpt-4.1-nano");
        assert!(oracle
            .complete("system", "prompt", Duration::from_secs(5))
            .await
            .is_err());
    }
}
