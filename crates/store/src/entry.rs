//! Entry representation for the expiring store

use serde_json::Value;
use std::time::Duration;

/// A single stored value together with its expiry bookkeeping
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// Stored value
    pub value: Value,
    /// Position on the store's clock timeline when the entry was written
    pub inserted_at: Duration,
    /// TTL for this entry; `None` means it never expires
    pub ttl: Option<Duration>,
}

impl StoreEntry {
    pub fn new(value: Value, inserted_at: Duration, ttl: Option<Duration>) -> Self {
        Self {
            value,
            inserted_at,
            ttl,
        }
    }

    /// Whether the entry has outlived its TTL at clock position `now`
    pub fn is_expired(&self, now: Duration) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_sub(self.inserted_at) > ttl,
            None => false,
        }
    }
}
