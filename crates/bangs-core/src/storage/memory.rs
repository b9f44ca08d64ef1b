use super::{StorageChange, StorageError, apply_set, change_channel, select};
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

/// In-process storage. Values vanish with the process.
pub struct MemoryStorage {
    data: Mutex<Value>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::with_value(Value::Object(Map::new()))
    }

    /// Start from an arbitrary stored value (tests use non-objects to
    /// exercise shape errors)
    #[must_use]
    pub fn with_value(value: Value) -> Self {
        Self {
            data: Mutex::new(value),
            changes: change_channel(),
        }
    }

    /// Replace a key as if another writer did it, announcing the change
    pub fn set_external(&self, key: &str, value: Value) {
        let mut values = Map::new();
        values.insert(key.to_string(), value);
        self.write(values);
    }

    fn write(&self, values: Map<String, Value>) {
        let changes = {
            let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
            apply_set(&mut data, values)
        };
        for change in changes {
            debug!("Storage key changed: {}", change.key);
            // No subscribers is fine
            let _ = self.changes.send(change);
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Storage for MemoryStorage {
    async fn get(&self, keys: &[&str]) -> Result<Value, StorageError> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(select(&data, keys))
    }

    async fn set(&self, values: Map<String, Value>) -> Result<(), StorageError> {
        self.write(values);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
