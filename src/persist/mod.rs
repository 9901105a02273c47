//! Persistent key-value collaborator and its backends.
//!
//! All encoding is JSON handled by the callers; this layer moves
//! opaque strings, mirroring browser `localStorage`.

/// Shared in-memory backend, clonable across "tabs".
pub mod memory;
/// SQLite-backed durable backend.
pub mod sqlite;

/// Persistence failure.
#[derive(Debug)]
pub enum PersistError {
    /// Underlying SQLite error.
    Sqlite(rusqlite::Error),
    /// Payload encode/decode error.
    Serde(serde_json::Error),
    /// Backend-specific failure.
    Message(String),
}

impl From<rusqlite::Error> for PersistError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Result alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Durable string-to-string storage.
///
/// `read` returns `None` for absent keys. Writes are unconditional;
/// version discipline lives above this layer in the availability
/// store.
pub trait KvStore: Send {
    /// Reads the value stored under `key`, if any.
    fn read(&self, key: &str) -> PersistResult<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: &str) -> PersistResult<()>;
    /// Deletes `key`; absent keys are not an error.
    fn remove(&mut self, key: &str) -> PersistResult<()>;
}
