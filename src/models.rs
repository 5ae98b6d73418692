//! Core data models used throughout the pipeline.
//!
//! These types represent the comments, analyses, and processed records that
//! flow from the upstream source through the analyzer into the store and the
//! HTTP response.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::CommentError;

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
pub fn utc_timestamp() -> String {
    format!("{}Z", Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"))
}

/// Raw comment record as returned by the upstream source.
///
/// Kept as untyped JSON: only `body` is read, and a malformed element must
/// fail on its own rather than failing the whole fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawComment(Value);

impl RawComment {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the trimmed `body` text. A missing `body` reads as empty; a
    /// present `body` that is not a string (including `null`) is an error.
    pub fn body(&self) -> Result<String, CommentError> {
        let obj = self.0.as_object().ok_or(CommentError::NotAnObject)?;
        match obj.get("body") {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.trim().to_string()),
            Some(_) => Err(CommentError::BodyNotString),
        }
    }
}

/// Sentiment classification of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Maps a model-provided label onto the enum. Anything that is not one
    /// of the three labels (after trimming and lowercasing) is `Neutral`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary and sentiment derived from one comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub sentiment: Sentiment,
}

/// One comment's text plus its analysis and storage outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedItem {
    /// Trimmed comment body. Never empty.
    pub original: String,
    /// Model summary, or a diagnostic for a degraded analysis.
    pub analysis: String,
    pub sentiment: Sentiment,
    /// Whether the store accepted the record.
    pub stored: bool,
    pub timestamp: String,
}

/// Persisted shape of a [`ProcessedItem`]: the item tagged with the
/// requesting source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(flatten)]
    pub item: ProcessedItem,
    pub source: String,
}

/// Request body for `POST /pipeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Notification recipient.
    pub email: String,
    /// Label recorded with every stored item.
    pub source: String,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub items: Vec<ProcessedItem>,
    pub notification_sent: bool,
    pub processed_at: String,
    pub errors: Vec<String>,
}
