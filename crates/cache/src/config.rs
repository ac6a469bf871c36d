//! Cache construction configuration
//!
//! Identity is the one piece of configuration that matters for
//! persistence: it is the lookup key inside every external backend. When
//! the caller does not supply one, a process-wide counter allocates a
//! placeholder, which is only safe with a single instance — hence the
//! warning at construction time.

use once_cell::sync::Lazy;
use stashkv_store::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Allocator for placeholder identity sequence numbers.
///
/// A single process-wide instance backs all caches by default; tests
/// inject their own so the sequence is deterministic.
#[derive(Debug, Default)]
pub struct InstanceCounter {
    next: AtomicU64,
}

static PROCESS_COUNTER: Lazy<Arc<InstanceCounter>> = Lazy::new(Arc::default);

impl InstanceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The counter shared by every cache constructed without an explicit one
    pub fn process() -> Arc<InstanceCounter> {
        PROCESS_COUNTER.clone()
    }

    /// Hand out the next sequence number, incrementing once per call
    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Rewind to zero
    pub fn reset(&self) {
        self.next.store(0, Ordering::SeqCst);
    }
}

/// Construction parameters for a [`StorageCache`](crate::StorageCache)
#[derive(Default)]
pub struct CacheConfig {
    /// Unique identity; used as the lookup key inside every external backend
    pub id: Option<String>,
    /// TTL applied to entries that specify none
    pub default_ttl: Option<Duration>,
    /// Time source for expiry checks; wall clock when absent
    pub clock: Option<Arc<dyn Clock>>,
    /// Placeholder-identity allocator; the process-wide counter when absent
    pub instance_counter: Option<Arc<InstanceCounter>>,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("id", &self.id)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

/// Builder for [`CacheConfig`]
#[derive(Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache identity
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.config.id = Some(id.into());
        self
    }

    /// Set the default TTL for entries inserted without one
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = Some(ttl);
        self
    }

    /// Inject a time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.clock = Some(clock);
        self
    }

    /// Inject a placeholder-identity allocator
    pub fn with_instance_counter(mut self, counter: Arc<InstanceCounter>) -> Self {
        self.config.instance_counter = Some(counter);
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}
