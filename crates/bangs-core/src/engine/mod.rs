mod session;

use session::Session;

use crate::Result;
use crate::bootstrap::{self, DefaultSource};
use crate::config::Config;
use crate::gate::LoadGate;
use crate::search::SuggestionBuilder;
use crate::storage::Storage;
use bangs_types::{Dataset, Disposition, OmniboxEvent, OmniboxUpdate, TabAction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pause between attempts to read a dataset that failed to load
const LOAD_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Core bangs engine.
///
/// Owns the suggestion session and the dataset gate for the lifetime of the
/// process. Events are handled one at a time, in delivery order.
pub struct BangsCore<S: Storage> {
    storage: Arc<S>,
    config: Config,
    gate: Arc<LoadGate>,
    builder: SuggestionBuilder,
    session: Session,

    /// Channel to send updates to the address bar
    update_tx: UnboundedSender<OmniboxUpdate>,

    /// Task mirroring external dataset changes into the gate
    change_listener: Option<JoinHandle<()>>,
}

impl<S: Storage> BangsCore<S> {
    /// Create a new `BangsCore` instance with a channel for updates.
    /// Returns the core and a receiver for updates.
    pub fn new(storage: Arc<S>, config: Config) -> (Self, UnboundedReceiver<OmniboxUpdate>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let builder = SuggestionBuilder::new(config.omnibox.param_encoding);

        (
            Self {
                storage,
                config,
                gate: Arc::new(LoadGate::new()),
                builder,
                session: Session::default(),
                update_tx,
                change_listener: None,
            },
            update_rx,
        )
    }

    /// Initialize storage if needed, register the default suggestion, and
    /// start following external dataset changes.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if first-run initialization fails.
    pub async fn start<D: DefaultSource>(&mut self, source: &D) -> Result<()> {
        info!("Starting bangs core...");

        if bootstrap::ensure_initialized(self.storage.as_ref(), source).await? {
            info!("First run: storage initialized from {}", source.name());
        }

        self.send_update(OmniboxUpdate::DefaultSuggestion {
            description: self.config.omnibox.default_description.clone(),
        });

        if self.change_listener.is_none() {
            self.change_listener = Some(self.gate.follow_changes(self.storage.subscribe()));
        }

        info!("Bangs core started");
        Ok(())
    }

    /// Handle one address-bar event
    pub async fn process(&mut self, event: OmniboxEvent) {
        match event {
            OmniboxEvent::InputStarted => {
                self.handle_input_started();
            }
            OmniboxEvent::InputChanged { text } => {
                self.handle_input_changed(text).await;
            }
            OmniboxEvent::InputEntered { url, disposition } => {
                self.handle_input_entered(url, disposition).await;
            }
        }
    }

    /// Process events until the sender side closes
    pub async fn run(mut self, mut events: UnboundedReceiver<OmniboxEvent>) {
        while let Some(event) = events.recv().await {
            self.process(event).await;
        }
        debug!("Event channel closed, stopping core");
    }

    fn send_update(&self, update: OmniboxUpdate) {
        if self.update_tx.send(update).is_err() {
            warn!("Update receiver dropped");
        }
    }

    /// The dataset is re-read on every interaction so edits made elsewhere
    /// show up without a restart.
    fn handle_input_started(&mut self) {
        self.session.start();
        debug!("Input started (interaction {})", self.session.interaction());
        self.gate.begin_load(Arc::clone(&self.storage));
    }

    /// Start a load unless one is running or a dataset is cached
    fn ensure_loading(&self) {
        if self.gate.is_idle() {
            debug!("No dataset load in flight, starting one");
            self.gate.begin_load(Arc::clone(&self.storage));
        }
    }

    /// Wait for the dataset, re-reading storage while loads keep failing.
    ///
    /// `None` once the configured ready timeout passes.
    async fn await_dataset(&self) -> Option<Arc<Dataset>> {
        let wait = async {
            loop {
                self.ensure_loading();
                if let Some(dataset) = self.gate.wait_ready(Some(LOAD_RETRY_INTERVAL)).await {
                    return dataset;
                }
            }
        };

        match self.config.omnibox.ready_timeout() {
            Some(limit) => tokio::time::timeout(limit, wait).await.ok(),
            None => Some(wait.await),
        }
    }

    async fn handle_input_changed(&mut self, text: String) {
        self.session.record_input(text.clone());

        let Some(dataset) = self.await_dataset().await else {
            warn!("Dataset not ready in time, no suggestions for {:?}", text);
            return;
        };

        let suggestions = self.builder.suggest(&text, &dataset);
        debug!("{} suggestions for {:?}", suggestions.len(), text);
        self.send_update(OmniboxUpdate::Suggestions { suggestions });
    }

    async fn handle_input_entered(&mut self, url: String, disposition: Disposition) {
        let target = if self.session.is_default_entry(&url) {
            let Some(dataset) = self.await_dataset().await else {
                warn!("Dataset not ready in time, ignoring commit of {:?}", url);
                return;
            };
            match self.builder.first(&url, &dataset) {
                Some(suggestion) => suggestion.content,
                None => {
                    debug!("No bang matches {:?}, nothing to open", url);
                    return;
                }
            }
        } else {
            url
        };

        debug!("Opening {} ({:?})", target, disposition);
        self.send_update(OmniboxUpdate::OpenTab(TabAction::for_disposition(
            target,
            disposition,
        )));
    }

    #[cfg(test)]
    pub(crate) fn gate(&self) -> &Arc<LoadGate> {
        &self.gate
    }
}

impl<S: Storage> Drop for BangsCore<S> {
    fn drop(&mut self) {
        if let Some(listener) = self.change_listener.take() {
            listener.abort();
        }
    }
}
