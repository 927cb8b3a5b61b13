//! Visit history log

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{KeyValueStore, read_json, write_json};

/// Key under which the history log is persisted
pub const HISTORY_KEY: &str = "history";

/// Maximum number of retained entries
pub const HISTORY_CAPACITY: usize = 500;

/// One visited address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// Literal (decoded) address
    pub url: String,
    pub title: String,
    /// Milliseconds since the Unix epoch
    pub time: i64,
}

impl HistoryEntry {
    /// Create an entry with a fresh id
    pub fn new(url: impl Into<String>, title: impl Into<String>, time: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            title: title.into(),
            time,
        }
    }
}

/// Write side of the history log
#[cfg_attr(test, mockall::automock)]
pub trait HistorySink: Send + Sync {
    /// Append an entry
    fn record(&self, entry: HistoryEntry);
}

/// History log persisted through a key/value store
pub struct HistoryLog {
    store: Arc<dyn KeyValueStore>,
}

impl HistoryLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All entries, newest first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        read_json(self.store.as_ref(), HISTORY_KEY).unwrap_or_default()
    }

    /// Entries whose url or title contains `query` (case-insensitive)
    pub fn search(&self, query: &str) -> Vec<HistoryEntry> {
        let query = query.to_lowercase();
        self.entries()
            .into_iter()
            .filter(|e| {
                e.url.to_lowercase().contains(&query) || e.title.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.store.remove(HISTORY_KEY);
    }
}

impl HistorySink for HistoryLog {
    fn record(&self, entry: HistoryEntry) {
        let mut entries = self.entries();
        entries.insert(0, entry);
        entries.truncate(HISTORY_CAPACITY);
        if let Err(e) = write_json(self.store.as_ref(), HISTORY_KEY, &entries) {
            log::warn!("history write failed: {}", e);
        }
    }
}
