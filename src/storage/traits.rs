//! Storage traits and error types

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid value in ledger: {0}")]
    InvalidValue(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home for one cursor value
///
/// Implementations must make `save` atomic: a crash leaves either the old
/// value or the new one, never a torn file.
pub trait CursorStore<T: Serialize + DeserializeOwned> {
    /// Loads the stored value, or `None` if nothing has been saved yet
    fn load(&self) -> StorageResult<Option<T>>;

    /// Replaces the stored value
    fn save(&self, value: &T) -> StorageResult<()>;

    /// Removes the stored value; returns true if one existed
    fn clear(&self) -> StorageResult<bool>;
}
