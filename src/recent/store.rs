use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::storage::KeyValueStore;

/// Storage key holding the JSON-encoded list
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

pub const MAX_RECENT_SEARCHES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSearchEntry {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Bounded, de-duplicated list of past successful lookups, most recent first.
///
/// Storage failures are logged and swallowed here; nothing above this type
/// ever sees a `StorageError`.
pub struct RecentSearchesStore {
    storage: Arc<dyn KeyValueStore>,
    entries: Vec<RecentSearchEntry>,
}

impl RecentSearchesStore {
    /// Read the persisted list. Absent or malformed data yields an empty list.
    pub async fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let mut store = Self {
            storage,
            entries: Vec::new(),
        };

        if let Some(mut entries) = store.try_read().await {
            entries.truncate(MAX_RECENT_SEARCHES);
            tracing::debug!(count = entries.len(), "Loaded recent searches");
            store.entries = entries;
        }

        store
    }

    /// Insert at the front, drop any older entry with the same name
    /// (case-sensitive), keep at most five, then persist.
    pub async fn record(&mut self, entry: RecentSearchEntry) {
        self.entries.retain(|e| e.name != entry.name);
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_RECENT_SEARCHES);

        if !self.try_write().await {
            tracing::debug!("Recent searches kept in memory only");
        }
    }

    pub fn list(&self) -> &[RecentSearchEntry] {
        &self.entries
    }

    async fn try_read(&self) -> Option<Vec<RecentSearchEntry>> {
        let raw = match self.storage.get(RECENT_SEARCHES_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read recent searches");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed recent searches");
                None
            }
        }
    }

    async fn try_write(&self) -> bool {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode recent searches");
                return false;
            }
        };

        match self.storage.set(RECENT_SEARCHES_KEY, &json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist recent searches");
                false
            }
        }
    }
}
