//! Shared in-memory key-value backend.

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

use super::{KvStore, PersistError, PersistResult};

/// In-memory [`KvStore`] backed by a shared map.
///
/// Clones share the same cells, so two engines over clones of one
/// `MemoryKv` model two browser tabs racing on the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    cells: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKv {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn read(&self, key: &str) -> PersistResult<Option<String>> {
        let cells = self
            .cells
            .lock()
            .map_err(|_| PersistError::Message("kv mutex poisoned".to_string()))?;
        Ok(cells.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> PersistResult<()> {
        let mut cells = self
            .cells
            .lock()
            .map_err(|_| PersistError::Message("kv mutex poisoned".to_string()))?;
        cells.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PersistResult<()> {
        let mut cells = self
            .cells
            .lock()
            .map_err(|_| PersistError::Message("kv mutex poisoned".to_string()))?;
        cells.remove(key);
        Ok(())
    }
}
