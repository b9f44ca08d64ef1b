//! Key/value storage the dataset lives in.
//!
//! Mirrors the browser `storage.local` contract: `get` returns whatever the
//! backend holds for the requested keys, `set` overwrites whole values per
//! key, and every write (local or external) is announced to subscribers as a
//! [`StorageChange`].

mod file;
mod memory;

pub use file::{FileStorage, FileWatcher};
pub use memory::MemoryStorage;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use thiserror::Error;
use tokio::sync::broadcast;

/// Storage area every implementation in this crate reports changes for
pub const AREA_LOCAL: &str = "local";

/// Sentinel written once first-run initialization completed
pub const KEY_INIT: &str = "init";
/// The bang dataset
pub const KEY_BANGS: &str = "bangs";
/// Whether the dataset diverges from the bundled default
pub const KEY_MODIFIED: &str = "modified";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing some keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("result is not an object (querying keys {})", .keys.join(", "))]
    NotObject { keys: Vec<String> },

    #[error("result is null (querying keys {})", .keys.join(", "))]
    Null { keys: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

/// A key changed in a storage area
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub area: String,
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Backend for persisted extension state.
///
/// Futures are `Send` so loads can run on spawned tasks.
pub trait Storage: Send + Sync + 'static {
    /// Raw read of `keys`. Normally an object holding the keys that exist;
    /// callers validate the shape with [`get_all_keys`].
    fn get(&self, keys: &[&str]) -> impl Future<Output = Result<Value, StorageError>> + Send;

    /// Overwrite each given key with its new value
    fn set(&self, values: Map<String, Value>)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Receive a notification for every changed key
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Read `keys`, failing unless the result is an object holding all of them.
///
/// # Errors
///
/// `Null` for a null result, `NotObject` for any other non-object result,
/// `MissingKeys` listing every absent key, or the backend's own error.
pub async fn get_all_keys<S: Storage>(
    storage: &S,
    keys: &[&str],
) -> Result<Map<String, Value>, StorageError> {
    let owned = || keys.iter().map(ToString::to_string).collect::<Vec<_>>();

    let map = match storage.get(keys).await? {
        Value::Object(map) => map,
        Value::Null => return Err(StorageError::Null { keys: owned() }),
        _ => return Err(StorageError::NotObject { keys: owned() }),
    };

    let missing: Vec<String> = keys
        .iter()
        .filter(|k| !map.contains_key(**k))
        .map(ToString::to_string)
        .collect();

    if missing.is_empty() {
        Ok(map)
    } else {
        Err(StorageError::MissingKeys(missing))
    }
}

/// Read a single key.
///
/// # Errors
///
/// Same failure kinds as [`get_all_keys`].
pub async fn get_key<S: Storage>(storage: &S, key: &str) -> Result<Value, StorageError> {
    let mut map = get_all_keys(storage, &[key]).await?;
    Ok(map.remove(key).unwrap_or(Value::Null))
}

/// Read a single key and deserialize it.
///
/// # Errors
///
/// Same failure kinds as [`get_all_keys`], plus `Json` when the stored value
/// has the wrong shape.
pub async fn get_typed<S: Storage, T: DeserializeOwned>(
    storage: &S,
    key: &str,
) -> Result<T, StorageError> {
    let value = get_key(storage, key).await?;
    Ok(serde_json::from_value(value)?)
}

/// Per-key differences between two stored objects.
/// Non-object values count as empty.
pub(crate) fn diff(old: &Value, new: &Value) -> Vec<StorageChange> {
    let empty = Map::new();
    let old_map = old.as_object().unwrap_or(&empty);
    let new_map = new.as_object().unwrap_or(&empty);

    let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter(|key| old_map.get(*key) != new_map.get(*key))
        .map(|key| StorageChange {
            area: AREA_LOCAL.to_string(),
            key: key.clone(),
            old_value: old_map.get(key).cloned(),
            new_value: new_map.get(key).cloned(),
        })
        .collect()
}

/// Apply `values` to `current` in place, returning one change per written key
pub(crate) fn apply_set(current: &mut Value, values: Map<String, Value>) -> Vec<StorageChange> {
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    let Value::Object(map) = current else {
        return Vec::new();
    };

    values
        .into_iter()
        .map(|(key, value)| {
            let old_value = map.insert(key.clone(), value.clone());
            StorageChange {
                area: AREA_LOCAL.to_string(),
                key,
                old_value,
                new_value: Some(value),
            }
        })
        .collect()
}

/// Project `keys` out of a stored value. Non-object values are returned as-is
/// so [`get_all_keys`] can report their kind.
pub(crate) fn select(current: &Value, keys: &[&str]) -> Value {
    match current {
        Value::Object(map) => Value::Object(
            keys.iter()
                .filter_map(|k| map.get(*k).map(|v| ((*k).to_string(), v.clone())))
                .collect(),
        ),
        other => other.clone(),
    }
}

pub(crate) fn change_channel() -> broadcast::Sender<StorageChange> {
    broadcast::channel(CHANGE_CHANNEL_CAPACITY).0
}
