//! Dataset cache guarded by a readiness state.
//!
//! The gate is `NotReady` until a storage read completes, and goes back to
//! `NotReady` whenever a new address-bar interaction begins. State and
//! dataset are published together through a `watch` channel so readers
//! never see one without the other. Queries wait on the channel instead of
//! polling.

use crate::storage::{self, AREA_LOCAL, KEY_BANGS, Storage, StorageChange};
use bangs_types::Dataset;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Readiness of the cached dataset
#[derive(Debug, Clone, Default)]
enum GateState {
    #[default]
    NotReady,
    Ready(Arc<Dataset>),
}

impl GateState {
    fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    fn dataset(&self) -> Option<&Arc<Dataset>> {
        match self {
            Self::Ready(dataset) => Some(dataset),
            Self::NotReady => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    generation: u64,
    state: GateState,
}

/// Identifies one load; completions from superseded loads are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

pub struct LoadGate {
    tx: watch::Sender<Snapshot>,
    load: Mutex<Option<JoinHandle<()>>>,
}

impl LoadGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(Snapshot::default()),
            load: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.tx.borrow().state.is_ready()
    }

    /// Cached dataset, if ready
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.tx.borrow().state.dataset().cloned()
    }

    /// Drop readiness and hand out a ticket for the load that will refill it
    pub fn invalidate(&self) -> LoadTicket {
        let mut ticket = LoadTicket(0);
        self.tx.send_modify(|snap| {
            snap.generation += 1;
            snap.state = GateState::NotReady;
            ticket = LoadTicket(snap.generation);
        });
        ticket
    }

    /// Finish the load identified by `ticket`.
    ///
    /// Returns `false` (and changes nothing) if another load or an external
    /// change superseded it.
    pub fn complete(&self, ticket: LoadTicket, dataset: Dataset) -> bool {
        let mut dataset = Some(dataset);
        self.tx.send_if_modified(|snap| {
            if snap.generation != ticket.0 {
                return false;
            }
            if let Some(dataset) = dataset.take() {
                snap.state = GateState::Ready(Arc::new(dataset));
            }
            true
        })
    }

    /// Install a dataset delivered by a change notification.
    /// Supersedes any load in flight.
    pub fn apply_external(&self, dataset: Dataset) {
        self.abort_load();
        self.tx.send_modify(|snap| {
            snap.generation += 1;
            snap.state = GateState::Ready(Arc::new(dataset));
        });
    }

    /// Wait until the gate is ready.
    ///
    /// `None` means the wait timed out; the caller must not answer from
    /// any other data. A `None` timeout waits indefinitely.
    pub async fn wait_ready(&self, timeout: Option<Duration>) -> Option<Arc<Dataset>> {
        if let Some(dataset) = self.snapshot() {
            return Some(dataset);
        }

        let mut rx = self.tx.subscribe();
        let wait = async move {
            rx.wait_for(|snap| snap.state.is_ready())
                .await
                .ok()
                .and_then(|snap| snap.state.dataset().cloned())
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.ok().flatten(),
            None => wait.await,
        }
    }

    /// Whether nothing is cached and no load is running
    #[must_use]
    pub fn is_idle(&self) -> bool {
        if self.is_ready() {
            return false;
        }
        let load = self.load.lock().unwrap_or_else(PoisonError::into_inner);
        load.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Invalidate and start reading the dataset from storage.
    /// A load already in flight is aborted.
    pub fn begin_load<S: Storage>(self: &Arc<Self>, storage: Arc<S>) {
        self.abort_load();
        let ticket = self.invalidate();
        debug!("Starting dataset load {:?}", ticket);

        let gate = Arc::clone(self);
        let handle = tokio::spawn(async move {
            match storage::get_typed::<_, Dataset>(storage.as_ref(), KEY_BANGS).await {
                Ok(dataset) => {
                    let count = dataset.len();
                    if gate.complete(ticket, dataset) {
                        debug!("Dataset load {:?} complete ({} bangs)", ticket, count);
                    } else {
                        debug!("Dataset load {:?} superseded, discarding", ticket);
                    }
                }
                Err(e) => error!("Failed to load bangs from storage: {}", e),
            }
        });

        *self.load.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Keep the cache in sync with `bangs` changes made elsewhere
    pub fn follow_changes(
        self: &Arc<Self>,
        mut changes: broadcast::Receiver<StorageChange>,
    ) -> JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => gate.on_change(change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            "Missed {} storage change notifications, dropping cached dataset",
                            skipped
                        );
                        gate.resync();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Storage change channel closed");
                        break;
                    }
                }
            }
        })
    }

    fn on_change(&self, change: StorageChange) {
        if change.area != AREA_LOCAL || change.key != KEY_BANGS {
            return;
        }
        let Some(value) = change.new_value else {
            warn!("Bangs were removed from storage, keeping cached dataset");
            return;
        };
        match serde_json::from_value::<Dataset>(value) {
            Ok(dataset) => {
                info!("Bangs changed in storage ({} bangs)", dataset.len());
                self.apply_external(dataset);
            }
            Err(e) => warn!("Ignoring malformed bangs change: {}", e),
        }
    }

    /// Forget the cache and any load in flight; the next query reloads
    fn resync(&self) {
        self.abort_load();
        self.invalidate();
    }

    fn abort_load(&self) {
        if let Some(handle) = self
            .load
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl Default for LoadGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LoadGate {
    fn drop(&mut self) {
        self.abort_load();
    }
}
