//! Persistence coordinator for stashkv
//!
//! This crate wraps the expiring key/value store from `stashkv-store` and
//! mirrors its contents to zero or more external storage backends, either
//! on a wall-clock interval or after a configurable number of operations.
//! A previously persisted snapshot can be restored back into the cache.
//!
//! Persistence is best-effort and fire-and-forget: the coordinator never
//! retries a failed write, and a snapshot is always the full live table,
//! never a delta.

pub mod backend;
pub mod binding;
pub mod cache;
pub mod config;

pub use backend::{FileStorage, MemoryStorage, SessionStorage, StorageBackend};
pub use binding::{ExternalStorageOptions, StorageKind};
pub use cache::{RestoreOptions, SetOptions, StorageCache};
pub use config::{CacheConfig, CacheConfigBuilder, InstanceCounter};

// Re-export the store surface callers interact with through the cache
pub use stashkv_store::{Clock, ManualClock, Snapshot, SystemClock};
