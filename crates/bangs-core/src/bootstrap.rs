//! Default dataset loading and first-run initialization.

use crate::Result;
use crate::storage::{self, KEY_BANGS, KEY_INIT, KEY_MODIFIED, Storage, StorageError};
use bangs_types::Dataset;
use serde_json::{Map, Value};
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// Dataset shipped with the binary
pub const DEFAULT_BANGS_JSON: &str = include_str!("../data/default_bangs.json");

/// Source name reported for the bundled dataset
pub const BUNDLED_NAME: &str = "default_bangs.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not load {source_name}: {reason}")]
    CannotLoad { source_name: String, reason: String },

    #[error("bad JSON in {source_name}: {reason}")]
    BadJson { source_name: String, reason: String },
}

/// Where the default dataset comes from
pub trait DefaultSource: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> String;

    /// Fetch the raw document.
    /// Fails with [`LoadError::CannotLoad`] on transport errors only.
    fn fetch(&self) -> impl Future<Output = std::result::Result<String, LoadError>> + Send;
}

/// The dataset compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledSource;

impl DefaultSource for BundledSource {
    fn name(&self) -> String {
        BUNDLED_NAME.to_string()
    }

    async fn fetch(&self) -> std::result::Result<String, LoadError> {
        Ok(DEFAULT_BANGS_JSON.to_string())
    }
}

/// A dataset file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DefaultSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> std::result::Result<String, LoadError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LoadError::CannotLoad {
                source_name: self.name(),
                reason: e.to_string(),
            })
    }
}

/// Either of the shipped sources, picked by configuration
#[derive(Debug, Clone)]
pub enum AnySource {
    Bundled(BundledSource),
    File(FileSource),
}

impl AnySource {
    #[must_use]
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::File(FileSource::new(path)),
            None => Self::Bundled(BundledSource),
        }
    }
}

impl DefaultSource for AnySource {
    fn name(&self) -> String {
        match self {
            Self::Bundled(s) => s.name(),
            Self::File(s) => s.name(),
        }
    }

    async fn fetch(&self) -> std::result::Result<String, LoadError> {
        match self {
            Self::Bundled(s) => s.fetch().await,
            Self::File(s) => s.fetch().await,
        }
    }
}

/// Parse a dataset document. A `null` body counts as bad JSON.
///
/// # Errors
///
/// Returns [`LoadError::BadJson`] if the document is not a list of bangs.
pub fn parse_dataset(source_name: &str, body: &str) -> std::result::Result<Dataset, LoadError> {
    let bad_json = |reason: String| LoadError::BadJson {
        source_name: source_name.to_string(),
        reason,
    };

    let value: Value = serde_json::from_str(body).map_err(|e| bad_json(e.to_string()))?;
    if value.is_null() {
        return Err(bad_json("document is null".to_string()));
    }
    serde_json::from_value(value).map_err(|e| bad_json(e.to_string()))
}

/// Fetch and parse the default dataset.
///
/// # Errors
///
/// Returns a [`LoadError`] if fetching or parsing fails.
pub async fn load_default<D: DefaultSource>(source: &D) -> std::result::Result<Dataset, LoadError> {
    let body = source.fetch().await?;
    let dataset = parse_dataset(&source.name(), &body)?;
    debug!("Loaded {} default bangs from {}", dataset.len(), source.name());
    Ok(dataset)
}

/// Values written when the dataset is (re)set to the default.
///
/// # Errors
///
/// Returns [`StorageError::Json`] if the dataset cannot be serialized.
pub fn default_values(dataset: &Dataset) -> std::result::Result<Map<String, Value>, StorageError> {
    let mut values = Map::new();
    values.insert(KEY_BANGS.to_string(), serde_json::to_value(dataset)?);
    values.insert(KEY_MODIFIED.to_string(), Value::Bool(false));
    Ok(values)
}

/// Populate storage from the default dataset unless already initialized.
///
/// Returns `true` when initialization ran. Only a missing `init` key counts
/// as "not initialized"; any other storage failure is returned unchanged.
///
/// # Errors
///
/// Returns an error if storage cannot be read or written, or the default
/// dataset cannot be loaded.
pub async fn ensure_initialized<S: Storage, D: DefaultSource>(
    storage: &S,
    source: &D,
) -> Result<bool> {
    match storage::get_key(storage, KEY_INIT).await {
        Ok(_) => {
            debug!("Storage already initialized");
            Ok(false)
        }
        Err(StorageError::MissingKeys(_)) => {
            info!("Storage not initialized, loading defaults from {}", source.name());
            let dataset = load_default(source).await?;
            let mut values = default_values(&dataset)?;
            values.insert(KEY_INIT.to_string(), Value::Bool(true));
            storage.set(values).await?;
            info!("Initialized storage with {} bangs", dataset.len());
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}
