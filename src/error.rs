//! Error kinds for the pipeline components.
//!
//! Each component reports failures through its own error type. None of them
//! escape a pipeline run: the orchestrator converts every one of them into a
//! degraded value (a neutral analysis, `stored: false`) or an entry in the
//! response's `errors` array.

use thiserror::Error;

/// Maximum number of characters of a diagnostic kept in user-visible strings.
pub const DIAGNOSTIC_LIMIT: usize = 80;

/// Truncates a diagnostic message to [`DIAGNOSTIC_LIMIT`] characters.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate_diagnostic(message: &str) -> String {
    message.chars().take(DIAGNOSTIC_LIMIT).collect()
}

/// The upstream comment source could not be read.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Fetch failed: {0}")]
    Http(String),

    #[error("Fetch failed: request timed out: {0}")]
    Timeout(String),

    #[error("Fetch failed: upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Fetch failed: expected a JSON array of comments, got {0}")]
    Shape(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let message = truncate_diagnostic(&err.to_string());
        if err.is_timeout() {
            FetchError::Timeout(message)
        } else {
            FetchError::Http(message)
        }
    }
}

/// The language-model call or the parse of its output failed.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion had no choices")]
    EmptyCompletion,

    #[error("invalid JSON in completion: {0}")]
    Json(#[from] serde_json::Error),

    #[error("completion JSON is not an object")]
    NotAnObject,

    #[error("analyzer is disabled")]
    Disabled,
}

/// A single comment could not be processed.
#[derive(Error, Debug)]
pub enum CommentError {
    #[error("comment is not a JSON object")]
    NotAnObject,

    #[error("'body' is not a string")]
    BodyNotString,
}

/// The persisted collection could not be written.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The notification log could not be appended to.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
