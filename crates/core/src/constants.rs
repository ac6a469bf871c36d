/// Constants used throughout the stashkv codebase
// Placeholder identity assigned when a cache is constructed without an id
pub const PLACEHOLDER_ID_PREFIX: &str = "tmp-storage";

// Environment variable names
pub const STASHKV_LOG_VAR: &str = "STASHKV_LOG";

// File extension used by the file-backed storage backend
pub const STORAGE_FILE_EXTENSION: &str = "json";
