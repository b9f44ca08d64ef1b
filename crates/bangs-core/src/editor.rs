//! Editing workflow for the stored dataset.
//!
//! Every action reads the current dataset, builds a new sorted one, and
//! writes it back whole. Only one action may run at a time: while an action's
//! storage I/O is outstanding, new actions are rejected with
//! [`EditError::Busy`] instead of being queued.

use crate::bootstrap::{self, DefaultSource, LoadError};
use crate::storage::{self, KEY_BANGS, KEY_MODIFIED, Storage, StorageError};
use bangs_types::{Bang, Dataset};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info};

/// A rule a bang record breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyKey,
    KeyContainsSpace,
    EmptyUrl,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::EmptyKey => "bang must not be empty.",
            Self::KeyContainsSpace => "bang must not contain spaces.",
            Self::EmptyUrl => "URL without param must not be empty.",
        };
        f.write_str(msg)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("processing, please wait...")]
    Busy,

    #[error("{}", join_issues(.0))]
    Invalid(Vec<ValidationIssue>),

    #[error("bang already exists: {0}, choose another bang or modify the existing one")]
    AlreadyExists(String),

    #[error("bang not found: {0}")]
    NotFound(String),

    #[error("new bang key already exists: {0}")]
    KeyTaken(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Check a record before it is written.
///
/// # Errors
///
/// Returns every broken rule at once.
pub fn validate(bang: &Bang) -> Result<(), EditError> {
    let mut issues = Vec::new();
    if bang.key.is_empty() {
        issues.push(ValidationIssue::EmptyKey);
    }
    if bang.key.chars().any(char::is_whitespace) {
        issues.push(ValidationIssue::KeyContainsSpace);
    }
    if bang.url_without_param.trim().is_empty() {
        issues.push(ValidationIssue::EmptyUrl);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(EditError::Invalid(issues))
    }
}

/// Dataset plus whether it diverges from the default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub bangs: Dataset,
    pub modified: bool,
}

/// Restores the stable flag when an action ends, however it ends
struct StableGuard<'a>(&'a AtomicBool);

impl Drop for StableGuard<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

pub struct BangEditor<S: Storage, D: DefaultSource> {
    storage: Arc<S>,
    source: D,
    stable: AtomicBool,
}

impl<S: Storage, D: DefaultSource> BangEditor<S, D> {
    #[must_use]
    pub fn new(storage: Arc<S>, source: D) -> Self {
        Self {
            storage,
            source,
            stable: AtomicBool::new(true),
        }
    }

    /// Whether no action is in progress
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.stable.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<StableGuard<'_>, EditError> {
        self.stable
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EditError::Busy)?;
        Ok(StableGuard(&self.stable))
    }

    async fn read_bangs(&self) -> Result<Dataset, EditError> {
        Ok(storage::get_typed(self.storage.as_ref(), KEY_BANGS).await?)
    }

    async fn write_bangs(&self, bangs: &Dataset, modified: bool) -> Result<(), EditError> {
        let mut values = Map::new();
        let bangs = serde_json::to_value(bangs).map_err(StorageError::from)?;
        values.insert(KEY_BANGS.to_string(), bangs);
        values.insert(KEY_MODIFIED.to_string(), Value::Bool(modified));
        self.storage.set(values).await?;
        Ok(())
    }

    /// Current dataset and modified flag.
    ///
    /// # Errors
    ///
    /// Returns an error if either key is missing or malformed.
    pub async fn list(&self) -> Result<Listing, EditError> {
        let mut values =
            storage::get_all_keys(self.storage.as_ref(), &[KEY_BANGS, KEY_MODIFIED]).await?;
        let bangs = serde_json::from_value(values.remove(KEY_BANGS).unwrap_or_default())
            .map_err(StorageError::from)?;
        let modified = values
            .remove(KEY_MODIFIED)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(Listing { bangs, modified })
    }

    /// Insert a new bang.
    ///
    /// # Errors
    ///
    /// `Busy`, `Invalid`, `AlreadyExists`, or a storage failure.
    pub async fn add(&self, bang: Bang) -> Result<Dataset, EditError> {
        let _guard = self.begin()?;
        validate(&bang)?;

        let bangs = self.read_bangs().await?;
        if bangs.contains_key(&bang.key) {
            return Err(EditError::AlreadyExists(bang.key));
        }

        let key = bang.key.clone();
        let updated = bangs.with_added(bang);
        self.write_bangs(&updated, true).await?;
        info!("Added bang {}", key);
        Ok(updated)
    }

    /// Fetch the record an edit will start from.
    ///
    /// # Errors
    ///
    /// `Busy`, `NotFound`, or a storage failure.
    pub async fn lookup(&self, key: &str) -> Result<Bang, EditError> {
        let _guard = self.begin()?;
        let bangs = self.read_bangs().await?;
        bangs
            .get(key)
            .cloned()
            .ok_or_else(|| EditError::NotFound(key.to_string()))
    }

    /// Replace the record keyed `original_key` with `bang`, possibly renaming it.
    ///
    /// # Errors
    ///
    /// `Busy`, `Invalid`, `NotFound`, `KeyTaken` when renaming onto an
    /// existing key, or a storage failure.
    pub async fn modify(&self, original_key: &str, bang: Bang) -> Result<Dataset, EditError> {
        let _guard = self.begin()?;
        validate(&bang)?;

        let bangs = self.read_bangs().await?;
        if !bangs.contains_key(original_key) {
            return Err(EditError::NotFound(original_key.to_string()));
        }
        if bang.key != original_key && bangs.contains_key(&bang.key) {
            return Err(EditError::KeyTaken(bang.key));
        }

        let updated = bangs.with_replaced(original_key, &bang);
        self.write_bangs(&updated, true).await?;
        info!("Modified bang {} -> {}", original_key, bang.key);
        Ok(updated)
    }

    /// Remove a bang.
    ///
    /// # Errors
    ///
    /// `Busy`, `NotFound`, or a storage failure.
    pub async fn delete(&self, key: &str) -> Result<Dataset, EditError> {
        let _guard = self.begin()?;

        let bangs = self.read_bangs().await?;
        if !bangs.contains_key(key) {
            return Err(EditError::NotFound(key.to_string()));
        }

        let updated = bangs.without(key);
        self.write_bangs(&updated, true).await?;
        info!("Deleted bang {}", key);
        Ok(updated)
    }

    /// Replace the dataset with the default one.
    ///
    /// # Errors
    ///
    /// `Busy`, a load failure, or a storage failure.
    pub async fn reset(&self) -> Result<Dataset, EditError> {
        let _guard = self.begin()?;

        let defaults = bootstrap::load_default(&self.source).await?;
        self.storage.set(bootstrap::default_values(&defaults)?).await?;
        debug!("Reset to {} default bangs", defaults.len());
        Ok(defaults)
    }
}
