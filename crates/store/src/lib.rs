//! Expiring key/value store for stashkv
//!
//! This crate provides the leaf storage mechanism the persistence
//! coordinator composes with: a flat key/value table with per-entry or
//! default expiry, plus full-snapshot `extract`/`load` operations. Time
//! flows through an injected [`Clock`] so expiry behavior is
//! deterministic under test.

pub mod clock;
pub mod entry;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::StoreEntry;
pub use store::{ExpiringStore, Snapshot};
