//! Pipeline orchestration.
//!
//! One run proceeds as:
//!
//! ```text
//! fetch ──▶ for each comment: body → analyze → store ──▶ notify ──▶ response
//! ```
//!
//! Comments are handled one at a time in arrival order. Nothing aborts a
//! run: a failed fetch becomes an error entry and an empty comment list, a
//! failed analysis becomes a neutral diagnostic summary, a failed store
//! becomes `stored: false`, and a malformed comment becomes a
//! `"Comment error: ..."` entry while the remaining comments continue.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analyzer::{create_client, Analyzer};
use crate::config::Config;
use crate::error::{truncate_diagnostic, CommentError};
use crate::models::{utc_timestamp, PipelineResponse, ProcessedItem, RawComment};
use crate::notify::Notifier;
use crate::source::{CommentSource, HttpCommentSource};
use crate::store::ResultStore;

/// Prefix of per-comment error entries.
pub const COMMENT_ERROR_PREFIX: &str = "Comment error: ";

/// The fetch → analyze → store → notify workflow.
pub struct Pipeline {
    source: Arc<dyn CommentSource>,
    analyzer: Analyzer,
    store: ResultStore,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn CommentSource>,
        analyzer: Analyzer,
        store: ResultStore,
        notifier: Notifier,
    ) -> Self {
        Self {
            source,
            analyzer,
            store,
            notifier,
        }
    }

    /// Wire the production components from configuration.
    ///
    /// The completion client is built here, once, and shared by every run.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = HttpCommentSource::new(&config.source)?;
        let analyzer = Analyzer::new(create_client(&config.analyzer)?);

        Ok(Self::new(
            Arc::new(source),
            analyzer,
            ResultStore::new(&config.storage.path),
            Notifier::new(&config.notify.log_path),
        ))
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Execute one pipeline run for `email`, tagging stored records with
    /// `source`.
    pub async fn run(&self, email: &str, source: &str) -> PipelineResponse {
        let mut errors = Vec::new();
        let mut items = Vec::new();

        let comments = match self.source.fetch_comments().await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "fetch failed");
                errors.push(e.to_string());
                Vec::new()
            }
        };

        let fetched = comments.len();
        let mut skipped = 0usize;

        for comment in &comments {
            match self.process_comment(comment, source).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => skipped += 1,
                Err(e) => {
                    warn!(error = %e, "comment failed");
                    errors.push(format!(
                        "{}{}",
                        COMMENT_ERROR_PREFIX,
                        truncate_diagnostic(&e.to_string())
                    ));
                }
            }
        }

        let success = !items.is_empty();
        let notifier = self.notifier.clone();
        let recipient = email.to_string();
        let sent = tokio::task::spawn_blocking(move || notifier.notify(&recipient, success))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "notify task failed");
                true
            });

        info!(
            fetched,
            processed = items.len(),
            skipped,
            errors = errors.len(),
            "pipeline run complete"
        );

        PipelineResponse {
            items,
            notification_sent: sent && success,
            processed_at: utc_timestamp(),
            errors,
        }
    }

    /// Analyze and store one comment. `Ok(None)` means the body was empty
    /// and the comment was skipped.
    async fn process_comment(
        &self,
        comment: &RawComment,
        source: &str,
    ) -> Result<Option<ProcessedItem>, CommentError> {
        let text = comment.body()?;
        if text.is_empty() {
            return Ok(None);
        }

        let analysis = self.analyzer.analyze(&text).await;
        let mut item = ProcessedItem {
            original: text,
            analysis: analysis.summary,
            sentiment: analysis.sentiment,
            stored: false,
            timestamp: utc_timestamp(),
        };
        item.stored = self.persist(&item, source).await;
        Ok(Some(item))
    }

    /// Run the blocking store write off the async worker threads.
    async fn persist(&self, item: &ProcessedItem, source: &str) -> bool {
        let store = self.store.clone();
        let item = item.clone();
        let source = source.to_string();
        tokio::task::spawn_blocking(move || store.store(&item, &source))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "store task failed");
                false
            })
    }
}
