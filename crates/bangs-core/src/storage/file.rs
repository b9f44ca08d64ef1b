use super::{StorageChange, StorageError, apply_set, change_channel, diff, select};
use notify::Watcher;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const RELOAD_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Storage backed by a single JSON object file.
///
/// The whole file is rewritten on every `set` (write to a sibling temp file,
/// then rename). Edits made to the file by other processes are picked up by
/// [`FileStorage::watch`] and announced as changes.
#[derive(Clone)]
pub struct FileStorage {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    data: Mutex<Value>,
    changes: broadcast::Sender<StorageChange>,
}

/// Keeps the file watcher alive; dropping it stops change detection
pub struct FileWatcher {
    _watcher: notify::RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FileStorage {
    /// Open the storage file, starting empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let data = read_file(&path)?;
        debug!("Opened storage at {}", path.display());

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                data: Mutex::new(data),
                changes: change_channel(),
            }),
        })
    }

    /// Watch the file for external edits.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or the parent
    /// directory cannot be watched.
    pub fn watch(&self) -> Result<FileWatcher, StorageError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let file_name = self.inner.path.file_name().map(ToOwned::to_owned);

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
                Ok(event) => match event.kind {
                    notify::EventKind::Modify(_) | notify::EventKind::Create(_) => {
                        if event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(ToOwned::to_owned) == file_name)
                        {
                            let _ = tx.send(());
                        }
                    }
                    _ => {}
                },
                Err(e) => {
                    error!("Storage watcher error: {}", e);
                }
            })?;

        let Some(parent) = self.inner.path.parent() else {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Invalid storage path",
            )));
        };
        watcher.watch(parent, notify::RecursiveMode::NonRecursive)?;
        info!("Watching storage file: {}", self.inner.path.display());

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(RELOAD_SETTLE_DELAY).await;
                while rx.try_recv().is_ok() {}

                if let Err(e) = inner.reload().await {
                    warn!("Failed to reload storage file: {}", e);
                }
            }
            debug!("Storage watcher channel closed");
        });

        Ok(FileWatcher {
            _watcher: watcher,
            task,
        })
    }
}

impl Inner {
    /// Re-read the file and announce keys that differ from the cached copy.
    /// Our own writes leave nothing to announce here.
    ///
    /// The file is read under the cache lock so a concurrent `set` cannot
    /// land between the read and the swap.
    async fn reload(&self) -> Result<(), StorageError> {
        let changes = {
            let mut data = self.data.lock().await;
            let fresh = match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => serde_json::from_str(&content)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Object(Map::new()),
                Err(e) => return Err(e.into()),
            };
            let changes = diff(&data, &fresh);
            *data = fresh;
            changes
        };

        for change in changes {
            debug!("Storage key changed externally: {}", change.key);
            let _ = self.changes.send(change);
        }
        Ok(())
    }

    async fn persist(&self, data: &Value) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(data)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Value, StorageError> {
    if !path.exists() {
        debug!("Storage file not found at {}", path.display());
        return Ok(Value::Object(Map::new()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

impl super::Storage for FileStorage {
    async fn get(&self, keys: &[&str]) -> Result<Value, StorageError> {
        let data = self.inner.data.lock().await;
        Ok(select(&data, keys))
    }

    async fn set(&self, values: Map<String, Value>) -> Result<(), StorageError> {
        let changes = {
            let mut data = self.inner.data.lock().await;
            let mut next = data.clone();
            let changes = apply_set(&mut next, values);
            self.inner.persist(&next).await?;
            *data = next;
            changes
        };

        for change in changes {
            let _ = self.inner.changes.send(change);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.changes.subscribe()
    }
}
