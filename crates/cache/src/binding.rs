//! Storage bindings: one registered external persistence target
//!
//! A binding pairs a backend with its firing policy. Bindings are
//! append-only: once registered they are never removed or reconfigured,
//! and registration order is iteration order.

use crate::backend::StorageBackend;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Which host store a binding resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Durable file-backed store under the XDG cache directory
    Local,
    /// Process-lifetime in-memory store shared by all instances
    Session,
    /// Caller-supplied capability
    Custom,
}

/// Registration parameters for `add_external_storage`
#[derive(Default)]
pub struct ExternalStorageOptions {
    /// Optional label, used only to select a binding for restore
    pub id: Option<String>,
    /// Host store to resolve; `None` is rejected with a warning
    pub kind: Option<StorageKind>,
    /// Capability for the `Custom` kind
    pub storage: Option<Arc<dyn StorageBackend>>,
    /// Wall-clock period for timer-driven snapshots
    pub interval: Option<Duration>,
    /// Snapshot every N operations across the whole cache instance
    pub interval_in_operations: Option<u64>,
}

impl ExternalStorageOptions {
    /// Target the durable file-backed store
    pub fn local() -> Self {
        Self {
            kind: Some(StorageKind::Local),
            ..Self::default()
        }
    }

    /// Target the process-lifetime session store
    pub fn session() -> Self {
        Self {
            kind: Some(StorageKind::Session),
            ..Self::default()
        }
    }

    /// Target a caller-supplied capability
    pub fn custom(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            kind: Some(StorageKind::Custom),
            storage: Some(storage),
            ..Self::default()
        }
    }

    /// Label this binding for selective restore
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Persist a snapshot on this wall-clock period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Persist a snapshot every `n` operations
    pub fn with_interval_in_operations(mut self, n: u64) -> Self {
        self.interval_in_operations = Some(n);
        self
    }
}

/// A registered external persistence target
pub(crate) struct StorageBinding {
    /// Caller-supplied label; only consulted by restore
    pub id: Option<String>,
    pub kind: StorageKind,
    pub backend: Arc<dyn StorageBackend>,
    /// Fire every N operations; `None` disables operation counting
    pub interval_in_operations: Option<u64>,
    /// Operations seen since the last operation-count write
    pub operations_counter: AtomicU64,
    /// Armed interval timer, if any
    pub timer: Option<JoinHandle<()>>,
}

impl Drop for StorageBinding {
    fn drop(&mut self) {
        // The timer task holds no state worth flushing; just stop it
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for StorageBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBinding")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("interval_in_operations", &self.interval_in_operations)
            .field("timer_armed", &self.timer.is_some())
            .finish()
    }
}
