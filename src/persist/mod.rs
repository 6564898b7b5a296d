//! Local persisted key/value storage.
//!
//! Backs static mode's auth state, the same role browser local storage plays
//! for a page served from disk.

/// SQLite implementation.
pub mod sqlite;

use thiserror::Error;

/// Failure talking to local storage.
#[derive(Debug, Error)]
pub enum PersistError {
    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Stored value could not be (de)serialized.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything else.
    #[error("{0}")]
    Message(String),
}

/// Result alias for storage calls.
pub type PersistResult<T> = Result<T, PersistError>;

/// String key/value store surviving process restarts.
pub trait LocalStore: Send {
    /// Reads `key`.
    fn get(&self, key: &str) -> PersistResult<Option<String>>;
    /// Writes `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> PersistResult<()>;
    /// Deletes `key`; returns whether it existed.
    fn remove(&mut self, key: &str) -> PersistResult<bool>;
}
