//! Comment analysis through a language-model completion service.
//!
//! Defines the [`CompletionClient`] trait and concrete implementations:
//! - **[`DisabledClient`]** — fails every call; every analysis degrades.
//! - **[`ChatCompletionClient`]** — calls an OpenAI-compatible
//!   `POST {base_url}/chat/completions` endpoint (Groq or OpenAI).
//!
//! The [`Analyzer`] wraps a client, builds the instruction prompt, and
//! validates the model's JSON before trusting it.
//!
//! # Client Selection
//!
//! Use [`create_client`] once at startup and share the result:
//!
//! ```rust
//! # use comment_pipeline::config::AnalyzerConfig;
//! # use comment_pipeline::analyzer::{create_client, Analyzer};
//! let mut config = AnalyzerConfig::default();
//! config.provider = "disabled".to_string();
//! let analyzer = Analyzer::new(create_client(&config).unwrap());
//! assert_eq!(analyzer.model_name(), "disabled");
//! ```
//!
//! # Degraded Results
//!
//! [`Analyzer::analyze`] never fails. Transport errors, error statuses,
//! invalid JSON and non-object payloads all yield
//! `summary = "AI failed: <diagnostic>"` with `sentiment = neutral`, where the
//! diagnostic is cut to 80 characters.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::AnalyzerConfig;
use crate::error::{truncate_diagnostic, AnalysisError};
use crate::models::{AnalysisResult, Sentiment};

/// Prefix of the summary of a degraded analysis.
pub const DEGRADED_PREFIX: &str = "AI failed: ";

/// Summary used when the model omits one.
pub const MISSING_SUMMARY: &str = "No summary available";

/// A chat-completion backend that answers a single prompt with JSON text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the model identifier (e.g. `"llama-3.1-8b-instant"`).
    fn model_name(&self) -> &str;

    /// Send `prompt` as a single user message and return the raw content of
    /// the first choice.
    async fn complete_json(&self, prompt: &str) -> Result<String, AnalysisError>;
}

/// Build the configured completion client.
///
/// # Errors
///
/// Returns an error if the provider is unknown, or if it needs an API key
/// and the configured environment variable is unset or empty.
pub fn create_client(config: &AnalyzerConfig) -> Result<Arc<dyn CompletionClient>> {
    if !config.is_enabled() {
        return Ok(Arc::new(DisabledClient));
    }
    match config.provider.as_str() {
        "groq" | "openai" => Ok(Arc::new(ChatCompletionClient::new(config)?)),
        other => bail!("Unknown analyzer provider: {}", other),
    }
}

// ============ Disabled Client ============

/// A client that fails every call.
///
/// Used when `analyzer.provider = "disabled"`.
pub struct DisabledClient;

#[async_trait]
impl CompletionClient for DisabledClient {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete_json(&self, _prompt: &str) -> Result<String, AnalysisError> {
        Err(AnalysisError::Disabled)
    }
}

// ============ Chat Completion Client ============

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
///
/// Holds one `reqwest::Client` for the life of the process. No retries: a
/// failed call degrades that comment's analysis and the run moves on.
pub struct ChatCompletionClient {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ChatCompletionClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key environment variable is not set.
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let key_env = config.resolved_api_key_env();
        let api_key = match std::env::var(&key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("{} environment variable not set", key_env),
        };

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            endpoint: format!("{}/chat/completions", config.resolved_base_url()),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, prompt: &str) -> Result<String, AnalysisError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AnalysisError::EmptyCompletion)
    }
}

// ============ Analyzer ============

/// Summarizes and classifies comment text.
#[derive(Clone)]
pub struct Analyzer {
    client: Arc<dyn CompletionClient>,
}

impl Analyzer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Analyze `text`, degrading to a neutral diagnostic result on any
    /// failure.
    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        match self.try_analyze(text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(model = self.model_name(), error = %e, "analysis degraded");
                degraded(&e)
            }
        }
    }

    /// Analyze `text`, returning the error instead of degrading.
    pub async fn try_analyze(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        let content = self.client.complete_json(&build_prompt(text)).await?;
        parse_analysis(&content)
    }
}

/// The instruction prompt sent for one comment.
pub fn build_prompt(text: &str) -> String {
    format!(
        "Summarize this comment in 1-2 short sentences.\n\
         Classify sentiment as positive, negative or neutral.\n\
         Return ONLY JSON like this:\n\
         {{\n  \"summary\": \"your summary\",\n  \"sentiment\": \"positive\" or \"negative\" or \"neutral\"\n}}\n\
         \n\
         Comment: {}",
        text
    )
}

/// Validate model output.
///
/// The content must be a JSON object. A missing or non-string `summary`
/// becomes [`MISSING_SUMMARY`]; `sentiment` goes through
/// [`Sentiment::from_label`], so any unexpected value is `Neutral`.
pub fn parse_analysis(content: &str) -> Result<AnalysisResult, AnalysisError> {
    let json: Value = serde_json::from_str(content)?;
    let obj = json.as_object().ok_or(AnalysisError::NotAnObject)?;

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or(MISSING_SUMMARY)
        .to_string();

    let sentiment = obj
        .get("sentiment")
        .and_then(Value::as_str)
        .map(Sentiment::from_label)
        .unwrap_or_default();

    Ok(AnalysisResult { summary, sentiment })
}

/// The result reported when analysis fails.
pub fn degraded(err: &AnalysisError) -> AnalysisResult {
    AnalysisResult {
        summary: format!("{}{}", DEGRADED_PREFIX, truncate_diagnostic(&err.to_string())),
        sentiment: Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClient(Result<String, String>);

    #[async_trait]
    impl CompletionClient for FixedClient {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete_json(&self, _prompt: &str) -> Result<String, AnalysisError> {
            match &self.0 {
                Ok(s) => Ok(s.clone()),
                Err(body) => Err(AnalysisError::Status {
                    status: 500,
                    body: body.clone(),
                }),
            }
        }
    }

    fn analyzer(reply: Result<&str, &str>) -> Analyzer {
        Analyzer::new(Arc::new(FixedClient(
            reply.map(str::to_string).map_err(str::to_string),
        )))
    }

    #[test]
    fn test_prompt_embeds_text() {
        let prompt = build_prompt("great post!");
        assert!(prompt.starts_with("Summarize this comment"));
        assert!(prompt.ends_with("Comment: great post!"));
        assert!(prompt.contains("\"sentiment\""));
    }

    #[test]
    fn test_parse_valid() {
        let r = parse_analysis(r#"{"summary": "Likes it.", "sentiment": "Positive"}"#).unwrap();
        assert_eq!(r.summary, "Likes it.");
        assert_eq!(r.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_parse_unknown_sentiment_is_neutral() {
        let r = parse_analysis(r#"{"summary": "Meh.", "sentiment": "ambivalent"}"#).unwrap();
        assert_eq!(r.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_parse_missing_fields() {
        let r = parse_analysis("{}").unwrap();
        assert_eq!(r.summary, MISSING_SUMMARY);
        assert_eq!(r.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_parse_non_string_fields() {
        let r = parse_analysis(r#"{"summary": 7, "sentiment": ["positive"]}"#).unwrap();
        assert_eq!(r.summary, MISSING_SUMMARY);
        assert_eq!(r.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            parse_analysis("not json"),
            Err(AnalysisError::Json(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_analysis(r#"["positive"]"#),
            Err(AnalysisError::NotAnObject)
        ));
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let a = analyzer(Ok(r#"{"summary": "Angry.", "sentiment": "negative"}"#));
        let r = a.analyze("this is awful").await;
        assert_eq!(r.summary, "Angry.");
        assert_eq!(r.sentiment, Sentiment::Negative);
    }

    #[tokio::test]
    async fn test_analyze_degrades_on_service_error() {
        let long_body = "overloaded ".repeat(50);
        let a = analyzer(Err(long_body.as_str()));
        let r = a.analyze("text").await;

        assert_eq!(r.sentiment, Sentiment::Neutral);
        assert!(r.summary.starts_with(DEGRADED_PREFIX));
        let detail = &r.summary[DEGRADED_PREFIX.len()..];
        assert!(detail.chars().count() <= 80);
    }

    #[tokio::test]
    async fn test_analyze_degrades_on_bad_json() {
        let a = analyzer(Ok("Sure! Here is the JSON you asked for"));
        let r = a.analyze("text").await;
        assert_eq!(r.sentiment, Sentiment::Neutral);
        assert!(r.summary.starts_with("AI failed: invalid JSON"));
    }

    #[tokio::test]
    async fn test_disabled_client_degrades() {
        let a = Analyzer::new(Arc::new(DisabledClient));
        assert!(matches!(
            a.try_analyze("text").await,
            Err(AnalysisError::Disabled)
        ));
        let r = a.analyze("text").await;
        assert_eq!(r.summary, "AI failed: analyzer is disabled");
    }

    #[test]
    fn test_create_client_missing_key() {
        let config = AnalyzerConfig {
            api_key_env: Some("COMMENT_PIPELINE_TEST_UNSET_KEY".to_string()),
            ..AnalyzerConfig::default()
        };
        let err = create_client(&config).err().unwrap();
        assert!(err.to_string().contains("COMMENT_PIPELINE_TEST_UNSET_KEY"));
    }
}
