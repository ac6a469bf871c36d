//! The persistence coordinator
//!
//! `StorageCache` owns an [`ExpiringStore`] and mirrors full snapshots of
//! it to registered external backends. Every `set`/`get`/`remove` first
//! delegates to the store, then runs the operation-count sweep across all
//! bindings; `get` deliberately counts toward operation intervals so that
//! read-heavy usage still flushes snapshots periodically.

use crate::backend::{FileStorage, SessionStorage, StorageBackend};
use crate::binding::{ExternalStorageOptions, StorageBinding, StorageKind};
use crate::config::{CacheConfig, InstanceCounter};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use stashkv_core::{Error, Result, PLACEHOLDER_ID_PREFIX};
use stashkv_store::{ExpiringStore, Snapshot};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Options for a single `set` call
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// TTL for this entry only, overriding the cache default
    pub ttl: Option<Duration>,
}

impl SetOptions {
    pub fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}

/// Options for `restore_data`.
///
/// The `id` here selects a *binding label*, not the cache identity; the
/// two share a name in the external interface but never mix.
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub id: Option<String>,
}

impl RestoreOptions {
    /// Restore from the binding carrying this label
    pub fn binding(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

/// Time-aware key/value cache mirrored to external storage backends
pub struct StorageCache {
    id: String,
    store: Arc<ExpiringStore>,
    bindings: RwLock<Vec<StorageBinding>>,
}

impl StorageCache {
    /// Create a cache from the given configuration.
    ///
    /// A missing `id` is warned about and replaced with a generated
    /// placeholder; collisions between placeholders across instances are
    /// otherwise possible.
    pub fn new(config: CacheConfig) -> Self {
        let counter = config
            .instance_counter
            .unwrap_or_else(InstanceCounter::process);
        // The counter advances once per instance ever constructed, id or not
        let sequence = counter.allocate();

        let id = match config.id {
            Some(id) => id,
            None => {
                tracing::warn!(
                    "please set a unique id for the storage, especially with \
                     multiple storages in your application"
                );
                format!("{PLACEHOLDER_ID_PREFIX}-{sequence}")
            }
        };

        let store = match config.clock {
            Some(clock) => ExpiringStore::with_clock(config.default_ttl, clock),
            None => ExpiringStore::new(config.default_ttl),
        };

        Self {
            id,
            store: Arc::new(store),
            bindings: RwLock::new(Vec::new()),
        }
    }

    pub fn builder() -> crate::config::CacheConfigBuilder {
        CacheConfig::builder()
    }

    /// The cache identity used as the lookup key in every backend
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Insert or overwrite an entry, then run the persistence sweep
    pub fn set(&self, key: impl Into<String>, value: impl Serialize, options: SetOptions) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| Error::json("failed to encode value for caching", e))?;
        self.store.insert(key, value, options.ttl);
        self.store_data_by_operations()
    }

    /// Look up a live entry, then run the persistence sweep.
    ///
    /// Reads count toward operation intervals even though they mutate
    /// nothing; sweep write failures surface here.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let result = self.store.get(key);
        self.store_data_by_operations()?;
        Ok(result)
    }

    /// Delete an entry, then run the persistence sweep
    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        self.store_data_by_operations()
    }

    /// Snapshot of live entries
    pub fn extract(&self) -> Snapshot {
        self.store.extract()
    }

    /// Replace the whole entry table with the given snapshot
    pub fn load(&self, snapshot: Snapshot) {
        self.store.load(snapshot)
    }

    /// Register an external storage binding.
    ///
    /// Misconfiguration (no kind, or `Custom` without a capability) is
    /// warned about and registers nothing. When `interval` is set, a
    /// recurring timer is armed immediately — this requires a running
    /// tokio runtime.
    pub fn add_external_storage(&self, options: ExternalStorageOptions) {
        let backend: Arc<dyn StorageBackend> = match options.kind {
            Some(StorageKind::Local) => Arc::new(FileStorage::default_root()),
            Some(StorageKind::Session) => Arc::new(SessionStorage::new()),
            Some(StorageKind::Custom) => match options.storage {
                Some(storage) => storage,
                None => {
                    tracing::warn!("external storage must be provided for the custom kind");
                    return;
                }
            },
            None => {
                tracing::warn!("external storage kind is not recognized, skipped");
                return;
            }
        };

        let interval_in_operations = match options.interval_in_operations {
            Some(0) => {
                tracing::warn!("interval in operations must be positive, ignored");
                None
            }
            other => other,
        };

        let timer = options
            .interval
            .map(|period| self.arm_timer(period, Arc::clone(&backend)));

        self.bindings.write().push(StorageBinding {
            id: options.id,
            kind: options.kind.unwrap_or(StorageKind::Custom),
            backend,
            interval_in_operations,
            operations_counter: Default::default(),
            timer,
        });
    }

    /// Restore the entry table from a previously persisted snapshot.
    ///
    /// Selects the binding by label, or the first registered one; with no
    /// match the cache is left untouched. An absent persisted value loads
    /// an empty table; an unparsable one is an error.
    pub fn restore_data(&self, options: RestoreOptions) -> Result<()> {
        let bindings = self.bindings.read();

        let binding = match &options.id {
            Some(label) => bindings
                .iter()
                .find(|binding| binding.id.as_deref() == Some(label.as_str())),
            None => bindings.first(),
        };

        let Some(binding) = binding else {
            tracing::warn!("no external storage to restore data from");
            return Ok(());
        };

        let snapshot = match binding.backend.get_item(&self.id)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| Error::json("failed to parse persisted snapshot", e))?,
            None => Snapshot::new(),
        };

        self.store.load(snapshot);
        Ok(())
    }

    /// Number of registered bindings
    pub fn external_storage_count(&self) -> usize {
        self.bindings.read().len()
    }

    /// Number of bindings with a recurring timer armed
    pub fn armed_timer_count(&self) -> usize {
        self.bindings
            .read()
            .iter()
            .filter(|binding| binding.timer.is_some())
            .count()
    }

    /// Operation-count persistence sweep.
    ///
    /// Each binding's counter advances independently; a binding with
    /// `interval_in_operations = N` fires on the Nth, 2Nth, … qualifying
    /// operation, never the first.
    fn store_data_by_operations(&self) -> Result<()> {
        let bindings = self.bindings.read();

        for binding in bindings.iter() {
            let Some(n) = binding.interval_in_operations else {
                continue;
            };

            if binding.operations_counter.load(Ordering::SeqCst) == n - 1 {
                self.persist_snapshot(binding.backend.as_ref())?;
                binding.operations_counter.store(0, Ordering::SeqCst);
            } else {
                binding.operations_counter.fetch_add(1, Ordering::SeqCst);
            }
        }

        Ok(())
    }

    fn persist_snapshot(&self, backend: &dyn StorageBackend) -> Result<()> {
        let payload = serde_json::to_string(&self.store.extract())
            .map_err(|e| Error::json("failed to serialize snapshot", e))?;
        backend.set_item(&self.id, &payload)
    }

    fn arm_timer(
        &self,
        period: Duration,
        backend: Arc<dyn StorageBackend>,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let id = self.id.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the first write
            // belongs at creation time + period
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let payload = match serde_json::to_string(&store.extract()) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("failed to serialize snapshot for interval write: {e}");
                        continue;
                    }
                };

                // A tick has no caller to report to; log and keep mirroring
                if let Err(e) = backend.set_item(&id, &payload) {
                    tracing::error!("interval persistence write failed: {e}");
                }
            }
        })
    }
}

impl std::fmt::Debug for StorageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCache")
            .field("id", &self.id)
            .field("store", &self.store)
            .field("bindings", &self.bindings.read().len())
            .finish()
    }
}
