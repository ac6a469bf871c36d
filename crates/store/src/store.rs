//! The expiring key/value table

use crate::clock::{Clock, SystemClock};
use crate::entry::StoreEntry;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Flat mapping of live key → value, used for persistence and restore
pub type Snapshot = HashMap<String, Value>;

/// Key/value store with per-entry or default expiry.
///
/// The entry table is owned exclusively by the store; callers interact
/// with it only through the operations below. An expired entry is treated
/// as absent and dropped on read.
pub struct ExpiringStore {
    entries: DashMap<String, StoreEntry>,
    default_ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl ExpiringStore {
    /// Create a store on the system clock
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock::new()))
    }

    /// Create a store reading time from the given clock
    pub fn with_clock(default_ttl: Option<Duration>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            clock,
        }
    }

    /// Insert or overwrite an entry.
    ///
    /// An explicit `ttl` overrides the store default for this entry only;
    /// with neither, the entry never expires.
    pub fn insert(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        let effective_ttl = ttl.or(self.default_ttl);
        let entry = StoreEntry::new(value, self.clock.now(), effective_ttl);
        self.entries.insert(key.into(), entry);
    }

    /// Look up a live entry; an expired entry is removed and reported absent
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }

        // The read guard above is released before taking the shard write lock
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            tracing::trace!("dropped expired entry '{key}' on read");
        }
        None
    }

    /// Delete unconditionally; absent keys are not an error
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Snapshot of live entries only
    pub fn extract(&self) -> Snapshot {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect()
    }

    /// Replace the whole table with the given snapshot.
    ///
    /// Loaded entries take the store default TTL, the same as an `insert`
    /// without an explicit TTL; the snapshot format carries no expiry
    /// metadata.
    pub fn load(&self, snapshot: Snapshot) {
        self.entries.clear();
        for (key, value) in snapshot {
            self.insert(key, value, None);
        }
    }

    /// Drop every expired entry from the table
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ExpiringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("entry_count", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
