//! Persisted key/value collaborators
//!
//! The shell core never owns a persistence backend. It reads and writes
//! plain JSON records through [`KeyValueStore`]:
//! - `options`: the global options record (see [`crate::config::ShellOptions`])
//! - `sitePolicies`: per-hostname content policy overrides
//! - `history`: append-only visit log, newest-first, capped at 500
//! - `savedTabs`: session snapshot used for restore

mod history;
mod policy;
mod store;

pub use history::{HISTORY_CAPACITY, HISTORY_KEY, HistoryEntry, HistoryLog, HistorySink};
pub use policy::{
    EffectivePolicy, PolicyKind, SITE_POLICY_KEY, SitePolicy, SitePolicyTable, normalize_host,
    resolve_policy,
};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

#[cfg(test)]
pub use history::MockHistorySink;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::utils::Result;
use crate::utils::error::StorageError;

/// Read a JSON record, logging and returning `None` when it cannot be decoded
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("record {} unreadable: {}", key, e);
            None
        }
    }
}

/// Serialize and write a JSON record
pub fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, raw);
    Ok(())
}
