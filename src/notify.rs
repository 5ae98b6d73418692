//! Completion notifications.
//!
//! A notification is a single line printed to stdout and appended to a log
//! file:
//!
//! ```text
//! [2024-05-01T10:00:00.123456Z] Pipeline done. Success: True. To: ops@example.com
//! ```
//!
//! Writing the log is best effort. A failed append is logged and the
//! notification still counts as sent.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::models::utc_timestamp;

#[derive(Debug, Clone)]
pub struct Notifier {
    log_path: PathBuf,
}

impl Notifier {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Announce the end of a pipeline run. Always returns `true`.
    pub fn notify(&self, recipient: &str, success: bool) -> bool {
        let line = format_line(&utc_timestamp(), recipient, success);
        println!("{}", line);

        if let Err(e) = self.append(&line) {
            warn!(path = %self.log_path.display(), error = %e, "notification log write failed");
        }
        info!(recipient, success, "notification sent");
        true
    }

    fn append(&self, line: &str) -> Result<(), NotifyError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Format one notification line. `timestamp` already ends in `Z`.
pub fn format_line(timestamp: &str, recipient: &str, success: bool) -> String {
    let flag = if success { "True" } else { "False" };
    format!(
        "[{}] Pipeline done. Success: {}. To: {}",
        timestamp, flag, recipient
    )
}
