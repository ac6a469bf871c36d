//! Atomic file operations to prevent torn or corrupted persisted snapshots

use stashkv_core::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write data to a file atomically by writing to a temporary file in the
/// same directory and persisting it over the target path.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::configuration("invalid file path: no parent directory"))?;

    fs::create_dir_all(parent)
        .map_err(|e| Error::file_system(parent.to_path_buf(), "create parent directory", e))?;

    // The temp file must live in the target directory for the rename to be atomic
    let mut file = NamedTempFile::new_in(parent)
        .map_err(|e| Error::file_system(parent.to_path_buf(), "create temporary file", e))?;

    file.write_all(content)
        .map_err(|e| Error::file_system(file.path().to_path_buf(), "write temporary file", e))?;

    file.as_file()
        .sync_all()
        .map_err(|e| Error::file_system(file.path().to_path_buf(), "sync temporary file", e))?;

    file.persist(path)
        .map_err(|e| Error::file_system(path.to_path_buf(), "atomic rename", e.error))?;

    Ok(())
}

/// Write string content to a file atomically
pub fn write_atomic_string(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}
