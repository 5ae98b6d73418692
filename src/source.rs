//! Upstream comment source.
//!
//! The pipeline reads comments through the [`CommentSource`] trait. The
//! production implementation, [`HttpCommentSource`], issues a single GET
//! against the configured URL and keeps only the first `limit` elements of
//! the returned JSON array.
//!
//! # Failure
//!
//! Network errors, timeouts, non-2xx statuses and bodies that are not a JSON
//! array all produce a [`FetchError`]. The orchestrator records the error and
//! continues with zero comments.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::{truncate_diagnostic, FetchError};
use crate::models::RawComment;

/// A source of raw comments for one pipeline run.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Returns a one-line description used in logs.
    fn describe(&self) -> String;

    /// Fetch the comments to process, in arrival order.
    async fn fetch_comments(&self) -> Result<Vec<RawComment>, FetchError>;
}

/// Reads comments from an HTTP endpoint returning a JSON array.
pub struct HttpCommentSource {
    url: String,
    limit: usize,
    client: reqwest::Client,
}

impl HttpCommentSource {
    /// Build a source from configuration.
    ///
    /// The client carries the per-call timeout, so every fetch is bounded.
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            limit: config.limit,
            client,
        })
    }
}

#[async_trait]
impl CommentSource for HttpCommentSource {
    fn describe(&self) -> String {
        format!("GET {} (first {})", self.url, self.limit)
    }

    async fn fetch_comments(&self) -> Result<Vec<RawComment>, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_diagnostic(&body),
            });
        }

        let json: Value = response.json().await?;
        let comments = take_comments(json, self.limit)?;
        debug!(count = comments.len(), url = %self.url, "fetched comments");
        Ok(comments)
    }
}

/// Keep the first `limit` elements of a JSON array.
fn take_comments(json: Value, limit: usize) -> Result<Vec<RawComment>, FetchError> {
    match json {
        Value::Array(items) => Ok(items
            .into_iter()
            .take(limit)
            .map(RawComment::new)
            .collect()),
        other => Err(FetchError::Shape(json_kind(&other).to_string())),
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_comments_caps_at_limit() {
        let json = json!([
            {"body": "one"},
            {"body": "two"},
            {"body": "three"},
            {"body": "four"},
            {"body": "five"}
        ]);
        let comments = take_comments(json, 3).unwrap();
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[2].body().unwrap(), "three");
    }

    #[test]
    fn test_take_comments_shorter_than_limit() {
        let comments = take_comments(json!([{"body": "only"}]), 3).unwrap();
        assert_eq!(comments.len(), 1);
    }

    #[test]
    fn test_take_comments_rejects_object() {
        let err = take_comments(json!({"error": "nope"}), 3).unwrap_err();
        assert!(err.to_string().starts_with("Fetch failed: "));
        assert!(err.to_string().contains("an object"));
    }

    #[tokio::test]
    async fn test_unreachable_source_is_fetch_error() {
        let config = SourceConfig {
            // Port 9 (discard) on localhost is not listening in test environments.
            url: "http://127.0.0.1:9/comments".to_string(),
            limit: 3,
            timeout_secs: 2,
        };
        let source = HttpCommentSource::new(&config).unwrap();
        let err = source.fetch_comments().await.unwrap_err();
        assert!(err.to_string().starts_with("Fetch failed: "));
    }

    #[tokio::test]
    async fn test_silent_source_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let held = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                open.push(stream);
            }
        });

        let config = SourceConfig {
            url: format!("http://{}/comments", addr),
            limit: 3,
            timeout_secs: 1,
        };
        let source = HttpCommentSource::new(&config).unwrap();

        let started = std::time::Instant::now();
        let err = source.fetch_comments().await.unwrap_err();
        held.abort();

        assert!(matches!(err, FetchError::Timeout(_)));
        assert!(err.to_string().starts_with("Fetch failed: request timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
