//! Test fixtures and helpers

use crate::gate::LoadGate;
use crate::storage::{
    KEY_BANGS, KEY_INIT, KEY_MODIFIED, MemoryStorage, Storage, StorageChange, StorageError,
};
use bangs_types::{Bang, Dataset, OmniboxUpdate};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast, mpsc};

/// The Google bang used throughout the scenarios
pub fn google() -> Bang {
    Bang::new("g", "Google", "https://google.com")
        .with_param_template("https://google.com/search?q=", "")
}

pub fn github() -> Bang {
    Bang::new("gh", "GitHub", "https://github.com")
        .with_param_template("https://github.com/search?q=", "")
}

pub fn wikipedia() -> Bang {
    Bang::new("w", "Wikipedia", "https://en.wikipedia.org")
        .with_param_template("https://en.wikipedia.org/w/index.php?search=", "&go=Go")
}

pub fn sample_dataset() -> Dataset {
    Dataset::new(vec![wikipedia(), google(), github()])
}

/// Storage values of an initialized install holding `dataset`
pub fn initialized_values(dataset: &Dataset, modified: bool) -> Value {
    let mut values = Map::new();
    values.insert(KEY_INIT.to_string(), Value::Bool(true));
    values.insert(KEY_BANGS.to_string(), serde_json::to_value(dataset).unwrap());
    values.insert(KEY_MODIFIED.to_string(), Value::Bool(modified));
    Value::Object(values)
}

/// Memory storage already initialized with `dataset`
pub fn seeded_storage(dataset: &Dataset) -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::with_value(initialized_values(dataset, false)))
}

/// Storage whose reads and writes block until the test releases them
pub struct SlowStorage {
    pub inner: MemoryStorage,
    permits: Semaphore,
}

impl SlowStorage {
    pub fn new(inner: MemoryStorage) -> Self {
        Self {
            inner,
            permits: Semaphore::new(0),
        }
    }

    /// Let `n` more reads or writes through
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

impl Storage for SlowStorage {
    async fn get(&self, keys: &[&str]) -> Result<Value, StorageError> {
        self.pass().await;
        self.inner.get(keys).await
    }

    async fn set(&self, values: Map<String, Value>) -> Result<(), StorageError> {
        self.pass().await;
        self.inner.set(values).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.subscribe()
    }
}

/// Next update, failing the test if none arrives soon
pub async fn next_update(rx: &mut mpsc::UnboundedReceiver<OmniboxUpdate>) -> OmniboxUpdate {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for update")
        .expect("update channel closed")
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Wait until the gate caches a dataset holding `key`
pub async fn wait_for_key(gate: &LoadGate, key: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if gate.snapshot().is_some_and(|d| d.contains_key(key)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("gate never picked up the change");
}
