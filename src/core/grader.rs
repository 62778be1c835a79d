//! Rubric grading through the oracle.
//!
//! `Grader::score` never fails: transport errors, timeouts and unparseable
//! replies all come back as the all-zero fallback score, so one bad call
//! cannot abort a batch.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::adapters::Oracle;
use crate::domain::{Dimension, RubricScore, ScoreRequest};

use super::aggregator::{self, RangePolicy};

/// System message sent with every grading prompt
pub const SYSTEM_PROMPT: &str = "You are a precise educational grading assistant.";

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the grading prompt for one request
pub fn build_prompt(
    question: &str,
    response: &str,
    reference: &str,
    supporting_source: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are an expert in educational assessment. Grade the student's answer on five dimensions:\n\
         1. Accuracy (accuracy)\n\
         2. Relevance (relevance)\n\
         3. Logic (logic)\n\
         4. Conciseness (conciseness)\n\
         5. Language quality (language_quality)\n\
         \n\
         Question: {question}\n\
         Reference answer: {reference}\n\
         Student answer: {response}\n"
    );

    if let Some(source) = supporting_source {
        prompt.push_str(&format!(
            "Supporting source: {source}\n\
             If the student answer conflicts with the supporting source, lower the affected scores.\n"
        ));
    }

    prompt.push_str(
        "\nScore each dimension with an integer from 1 to 5, give the total score (total_score) \
         and a short overall comment. Reply with only a JSON object in exactly this format:\n\
         {\n  \"accuracy\": x,\n  \"relevance\": x,\n  \"logic\": x,\n  \"conciseness\": x,\n  \
         \"language_quality\": x,\n  \"total_score\": x,\n  \"overall_comment\": \"short explanation\"\n}",
    );

    prompt
}

/// Parse a raw oracle reply into a score.
///
/// Any failure yields the fallback score carrying the error and the raw
/// text. The oracle's own `total_score` is ignored.
pub fn parse_response(raw: &str, policy: RangePolicy) -> RubricScore {
    let (sub_scores, comment) = match parse_fields(raw) {
        Ok(fields) => fields,
        Err(error) => return RubricScore::fallback(error, raw),
    };

    match aggregator::aggregate(sub_scores, comment, policy) {
        Ok(score) => score,
        Err(out_of_range) => RubricScore::fallback(out_of_range.to_string(), raw),
    }
}

fn parse_fields(raw: &str) -> Result<([i64; 5], Option<String>), String> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, got {}", json_kind(&value)))?;

    let mut sub_scores = [0i64; 5];
    for (slot, dimension) in sub_scores.iter_mut().zip(Dimension::ALL) {
        *slot = read_sub_score(object, dimension)?;
    }

    let comment = object
        .get("overall_comment")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok((sub_scores, comment))
}

fn read_sub_score(object: &Map<String, Value>, dimension: Dimension) -> Result<i64, String> {
    match object.get(dimension.key()) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| format!("{} is not an integer: {}", dimension, n)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("{} is not an integer: {:?}", dimension, s)),
        Some(other) => Err(format!("{} is not an integer: {}", dimension, other)),
        None => Err(format!("missing field `{}`", dimension)),
    }
}

/// Strip surrounding whitespace and one markdown code fence
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    // A language tag may follow the opening fence, with or without a newline
    inner
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Grading client held by the ingestor
#[derive(Clone)]
pub struct Grader {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    policy: RangePolicy,
}

impl Grader {
    /// Create a grader with the default timeout and clamp policy
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            timeout: DEFAULT_TIMEOUT,
            policy: RangePolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_range_policy(mut self, policy: RangePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Name of the underlying oracle
    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Grade one response against a reference answer
    #[instrument(skip_all, fields(oracle = %self.oracle.name()))]
    pub async fn score(
        &self,
        question: &str,
        response: &str,
        reference: &str,
        supporting_source: Option<&str>,
    ) -> RubricScore {
        let prompt = build_prompt(question, response, reference, supporting_source);

        let call = self.oracle.complete(SYSTEM_PROMPT, &prompt, self.timeout);
        let output = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "Oracle call failed, recording zero score");
                return RubricScore::fallback(format!("{:#}", e), "");
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Oracle call timed out, recording zero score");
                return RubricScore::fallback(
                    format!("oracle timed out after {:?}", self.timeout),
                    "",
                );
            }
        };

        debug!(tokens = ?output.tokens_used, "Oracle replied");

        let score = parse_response(&output.content, self.policy);
        if let Some(error) = &score.error {
            warn!(%error, "Oracle reply rejected, recording zero score");
        }
        score
    }

    /// Grade a prepared request
    pub async fn score_request(&self, request: &ScoreRequest) -> RubricScore {
        self.score(
            &request.question_text,
            &request.bot_response,
            &request.standard_answer,
            request.supporting_source.as_deref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::OracleOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Oracle that replays canned replies and records prompts
    struct CannedOracle {
        reply: Result<String, String>,
        delay: Option<Duration>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedOracle {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                reply: Err(error.to_string()),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Oracle for CannedOracle {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, prompt: &str, _timeout: Duration) -> anyhow::Result<OracleOutput> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(OracleOutput::new(text.clone())),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }

        async fn health_check(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_prompt_lists_contract_keys() {
        let prompt = build_prompt("What is AI?", "Robots", "Artificial Intelligence", None);
        for key in [
            "accuracy",
            "relevance",
            "logic",
            "conciseness",
            "language_quality",
            "total_score",
            "overall_comment",
        ] {
            assert!(prompt.contains(key), "prompt should mention {}", key);
        }
        assert!(prompt.contains("Question: What is AI?"));
        assert!(!prompt.contains("Supporting source"));
    }

    #[test]
    fn test_prompt_with_supporting_source() {
        let prompt = build_prompt("Q", "A", "R", Some("Encyclopedia entry"));
        assert!(prompt.contains("Supporting source: Encyclopedia entry"));
        assert!(prompt.contains("conflicts with the supporting source"));
    }

    #[test]
    fn test_parse_discards_oracle_total() {
        let raw = r#"{"accuracy": 5, "relevance": 4, "logic": 4, "conciseness": 3,
                      "language_quality": 4, "total_score": 99, "overall_comment": "Good"}"#;
        let score = parse_response(raw, RangePolicy::Clamp);
        assert_eq!(score.total_score, 20);
        assert_eq!(score.overall_comment.as_deref(), Some("Good"));
        assert!(!score.is_fallback());
    }

    #[test]
    fn test_parse_missing_total_is_fine() {
        let raw = r#"{"accuracy": 1, "relevance": 1, "logic": 1, "conciseness": 1, "language_quality": 1}"#;
        let score = parse_response(raw, RangePolicy::Clamp);
        assert_eq!(score.total_score, 5);
        assert!(score.overall_comment.is_none());
    }

    #[test]
    fn test_parse_invalid_json_falls_back() {
        let raw = "I would give this a 4 out of 5.";
        let score = parse_response(raw, RangePolicy::Clamp);
        assert_eq!(score.sub_scores(), [0; 5]);
        assert_eq!(score.total_score, 0);
        assert!(score.error.is_some());
        assert_eq!(score.raw_response.as_deref(), Some(raw));
    }

    #[test]
    fn test_parse_non_object_falls_back() {
        let score = parse_response("[1, 2, 3]", RangePolicy::Clamp);
        assert_eq!(score.error.as_deref(), Some("expected a JSON object, got an array"));
    }

    #[test]
    fn test_parse_missing_dimension_falls_back() {
        let raw = r#"{"accuracy": 5, "relevance": 4, "logic": 4, "conciseness": 3}"#;
        let score = parse_response(raw, RangePolicy::Clamp);
        assert_eq!(score.error.as_deref(), Some("missing field `language_quality`"));
    }

    #[test]
    fn test_parse_tolerates_fence_and_string_numbers() {
        let raw = "```json\n{\"accuracy\": \"4\", \"relevance\": 4.0, \"logic\": 3, \
                   \"conciseness\": 5, \"language_quality\": 2}\n```\n";
        let score = parse_response(raw, RangePolicy::Clamp);
        assert_eq!(score.sub_scores(), [4, 4, 3, 5, 2]);
        assert_eq!(score.total_score, 18);
    }

    #[test]
    fn test_parse_single_line_fence() {
        let tagged = r#"```json{"accuracy":4,"relevance":4,"logic":4,"conciseness":4,"language_quality":4}```"#;
        assert_eq!(parse_response(tagged, RangePolicy::Clamp).total_score, 20);

        let bare = r#"```{"accuracy":3,"relevance":3,"logic":3,"conciseness":3,"language_quality":3}```"#;
        assert_eq!(parse_response(bare, RangePolicy::Clamp).total_score, 15);

        let prose = "```Sorry, no score```";
        assert!(parse_response(prose, RangePolicy::Clamp).is_fallback());
    }

    #[test]
    fn test_parse_range_policies() {
        let raw = r#"{"accuracy": 7, "relevance": 0, "logic": 3, "conciseness": 3, "language_quality": 3}"#;

        let clamped = parse_response(raw, RangePolicy::Clamp);
        assert_eq!(clamped.sub_scores(), [5, 1, 3, 3, 3]);
        assert_eq!(clamped.total_score, 15);

        let rejected = parse_response(raw, RangePolicy::Reject);
        assert!(rejected.is_fallback());
        assert_eq!(rejected.total_score, 0);
        assert_eq!(rejected.raw_response.as_deref(), Some(raw));
    }

    #[tokio::test]
    async fn test_score_passes_request_through_prompt() {
        let oracle = Arc::new(CannedOracle::replying(
            r#"{"accuracy": 3, "relevance": 3, "logic": 3, "conciseness": 3, "language_quality": 3, "overall_comment": "ok"}"#,
        ));
        let grader = Grader::new(oracle.clone());

        let request = ScoreRequest::new("q1", "What is Rust?", "A language", "A systems language")
            .with_supporting_source(Some("The Rust Book".to_string()));
        let score = grader.score_request(&request).await;

        assert_eq!(score.total_score, 15);
        let prompts = oracle.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Student answer: A language"));
        assert!(prompts[0].contains("Supporting source: The Rust Book"));
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let grader = Grader::new(Arc::new(CannedOracle::failing("connection refused")));
        let score = grader.score("Q", "A", "R", None).await;

        assert!(score.is_fallback());
        assert_eq!(score.total_score, 0);
        assert!(score.error.unwrap().contains("connection refused"));
        assert_eq!(score.raw_response.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let mut oracle = CannedOracle::replying("{}");
        oracle.delay = Some(Duration::from_millis(200));
        let grader = Grader::new(Arc::new(oracle)).with_timeout(Duration::from_millis(20));

        let score = grader.score("Q", "A", "R", None).await;

        assert!(score.is_fallback());
        assert!(score.error.unwrap().contains("timed out"));
    }
}
