//! Flat-file result store.
//!
//! Processed items are kept in a single JSON array on disk. Every store is a
//! read-modify-write of the whole file: load the array, push the new record,
//! write the array back pretty-printed. Non-ASCII text is written as-is.
//!
//! A missing file, or one that does not parse as a JSON array, is read as an
//! empty collection, so a corrupt file is replaced on the next store instead
//! of failing it.
//!
//! # Concurrency
//!
//! The read-modify-write is not atomic and takes no lock. Two stores racing
//! on the same file can lose one of the records (last writer wins). The
//! store assumes a single writer per file.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{ProcessedItem, StoredRecord};

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `item` tagged with `source`. Returns `false` if the write
    /// failed; the error is logged, not raised.
    pub fn store(&self, item: &ProcessedItem, source: &str) -> bool {
        match self.try_store(item, source) {
            Ok(_) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "store failed");
                false
            }
        }
    }

    /// Append `item` tagged with `source`, returning the new collection
    /// length.
    pub fn try_store(&self, item: &ProcessedItem, source: &str) -> Result<usize, StoreError> {
        let record = StoredRecord {
            item: item.clone(),
            source: source.to_string(),
        };

        let mut records = self.load();
        records.push(serde_json::to_value(&record)?);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, json)?;

        debug!(path = %self.path.display(), len = records.len(), "stored record");
        Ok(records.len())
    }

    /// Load the persisted collection.
    ///
    /// Records are returned as raw JSON so entries written by other tools
    /// or older versions survive the rewrite untouched.
    pub fn load(&self) -> Vec<Value> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(records)) => records,
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "persisted collection unreadable, starting empty");
                Vec::new()
            }
        }
    }

    /// Load the records that match the current record shape, skipping any
    /// that do not.
    pub fn load_records(&self) -> Vec<StoredRecord> {
        self.load()
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }
}
