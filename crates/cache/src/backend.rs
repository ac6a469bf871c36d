//! Storage backend capability and the built-in backends
//!
//! A backend only needs to store and return strings by key. The file
//! backend is the durable, cross-process store; the session backend lives
//! for the process; `MemoryStorage` is a plain per-instance map, useful as
//! a caller-supplied custom capability and as a test double.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use stashkv_core::{Error, Result, STORAGE_FILE_EXTENSION};
use stashkv_utils::atomic_file::write_atomic_string;
use stashkv_utils::xdg::XdgPaths;
use std::fs;
use std::path::PathBuf;

/// Minimum capability an external storage target must provide.
///
/// Errors from these methods are genuine I/O failures and are propagated
/// by the coordinator to the caller of the triggering operation.
pub trait StorageBackend: Send + Sync {
    /// Store `value` under `key`, overwriting any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Return the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>>;
}

/// Per-instance in-memory backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).map(|item| item.value().clone()))
    }
}

// One table for the whole process, dropped when it exits
static SESSION_ITEMS: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

/// Process-lifetime backend shared by every cache instance.
///
/// Plays the role of a session-scoped host store: contents survive across
/// cache instances but not across processes.
#[derive(Debug, Default)]
pub struct SessionStorage;

impl SessionStorage {
    pub fn new() -> Self {
        Self
    }

    /// Drop everything stored in the process-wide session table
    pub fn clear() {
        SESSION_ITEMS.clear();
    }
}

impl StorageBackend for SessionStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        SESSION_ITEMS.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(SESSION_ITEMS.get(key).map(|item| item.value().clone()))
    }
}

/// File-backed backend: one file per key under a root directory.
///
/// This is the durable host store; values written here survive the
/// process. Writes go through an atomic temp-file-then-rename so a
/// concurrent reader never observes a torn snapshot.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Backend rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Backend rooted at the stashkv XDG cache directory
    pub fn default_root() -> Self {
        Self::new(XdgPaths::cache_dir())
    }

    fn item_path(&self, key: &str) -> PathBuf {
        // Keys are cache identities, not paths; keep separators out of
        // the file name
        let name: String = key
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                other => other,
            })
            .collect();
        self.root.join(format!("{name}.{STORAGE_FILE_EXTENSION}"))
    }
}

impl StorageBackend for FileStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key);
        log::debug!("Writing persisted value to {path:?}");
        write_atomic_string(&path, value)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key);

        // Read without checking existence first (avoiding TOCTOU)
        match fs::read_to_string(&path) {
            Ok(content) => {
                log::debug!("Found persisted value at {path:?}");
                Ok(Some(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No persisted value at {path:?}");
                Ok(None)
            }
            Err(e) => Err(Error::file_system(path, "read persisted value", e)),
        }
    }
}
