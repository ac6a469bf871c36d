use std::path::PathBuf;

/// Result type alias for stashkv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for stashkv operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Storage backend errors
    #[error("storage backend '{backend}' failed during {operation}: {message}")]
    Storage {
        backend: String,
        operation: String,
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with the failed path and operation
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a JSON error with context
    #[must_use]
    pub fn json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Json {
            message: message.into(),
            source,
        }
    }

    /// Create a storage backend error
    #[must_use]
    pub fn storage(
        backend: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Storage {
            backend: backend.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}
