mod storage;
mod store;

pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{RecentSearchEntry, RecentSearchesStore, MAX_RECENT_SEARCHES, RECENT_SEARCHES_KEY};
