//! Watch worker: drains the event stream and publishes snapshots.
//!
//! # Responsibilities
//! - Establish the watch and process the initial event, if any
//! - Reconcile every content event against the last accepted snapshot
//! - Publish each result to the store and notify subscribers
//! - Turn stream failures into terminal states
//!
//! # Design Decisions
//! - The worker is the only writer of the accepted snapshot and keeps its own
//!   copy, so the store is never read back
//! - Cancellation is checked before each read and before each publish; a
//!   reconciliation that finishes after shutdown is discarded

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;

use crate::convert::{AcceptedSnapshot, DataConverter};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::provider::error::ProviderError;
use crate::provider::state::WatchState;
use crate::source::{EventSource, EventStream, SourceError, WatchEvent, WatchTarget};
use crate::store::ConfigurationStore;

pub(crate) struct WatchWorker<C> {
    converter: DataConverter,
    store: Arc<C>,
    snapshot: Arc<AcceptedSnapshot>,
    shutdown: Shutdown,
    state: watch::Sender<WatchState>,
}

impl<C: ConfigurationStore> WatchWorker<C> {
    pub(crate) fn new(
        converter: DataConverter,
        store: Arc<C>,
        shutdown: Shutdown,
        state: watch::Sender<WatchState>,
    ) -> Self {
        Self {
            converter,
            store,
            snapshot: Arc::new(AcceptedSnapshot::new()),
            shutdown,
            state,
        }
    }

    pub(crate) fn set_state(&self, state: WatchState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "ConfigMap watch state changed");
        }
    }

    fn current_state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Open the watch and wait up to `initial_sync` for the first event.
    ///
    /// A first event that arrives in time is processed before returning, so
    /// configuration read right after loading already reflects the cluster.
    pub(crate) async fn connect<S: EventSource + ?Sized>(
        &mut self,
        source: &S,
        target: &WatchTarget,
        initial_sync: Duration,
    ) -> Result<EventStream, ProviderError> {
        self.set_state(WatchState::Connecting);

        let mut events = source.watch(target).await.map_err(|error| {
            metrics::record_watch_failure(error.reason());
            ProviderError::Connect(error)
        })?;

        if initial_sync.is_zero() {
            return Ok(events);
        }

        match tokio::time::timeout(initial_sync, events.next()).await {
            Ok(Some(Ok(event))) => self.handle_event(event),
            Ok(Some(Err(error))) => {
                metrics::record_watch_failure(error.reason());
                return Err(ProviderError::Stream(error));
            }
            Ok(None) => {
                metrics::record_watch_failure("closed");
                return Err(ProviderError::StreamClosed);
            }
            Err(_) => {
                tracing::debug!(
                    timeout_ms = initial_sync.as_millis() as u64,
                    "No ConfigMap event within the initial sync window, continuing in background"
                );
            }
        }

        Ok(events)
    }

    /// Consume `events` until cancellation or the end of the stream.
    pub(crate) async fn run(mut self, mut events: EventStream) -> WatchState {
        let outcome = loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.wait() => None,
                next = events.next() => Some(next),
            };
            let Some(next) = next else {
                break WatchState::Stopped;
            };

            match next {
                Some(Ok(event)) => self.handle_event(event),
                Some(Err(error)) => break self.on_watch_error(&error),
                None => {
                    metrics::record_watch_failure("closed");
                    tracing::error!("ConfigMap watch stream ended, process needs to be restarted.");
                    break WatchState::Reconnecting;
                }
            }
        };

        drop(events);
        self.set_state(outcome);
        tracing::debug!(state = %outcome, "ConfigMap watch worker exited");
        outcome
    }

    pub(crate) fn handle_event(&mut self, event: WatchEvent) {
        if self.current_state() == WatchState::Connecting {
            self.set_state(WatchState::Streaming);
        }

        tracing::trace!(
            event = %event.kind,
            config_map = ?event.name,
            items = event.data.len(),
            "Received ConfigMap event"
        );

        if event.kind.carries_content() {
            self.reload(event);
        } else {
            tracing::trace!(event = %event.kind, "ConfigMap event is not being handled");
        }
    }

    fn reload(&mut self, event: WatchEvent) {
        let reconciliation = self.converter.reconcile(&self.snapshot, &event.data);

        if self.shutdown.is_triggered() {
            tracing::debug!(event = %event.kind, "Provider shut down, reconciled snapshot discarded");
            return;
        }

        let keys = reconciliation.snapshot.len();
        let skipped = reconciliation.skipped();
        self.snapshot = Arc::new(reconciliation.snapshot);
        self.store.replace(Arc::clone(&self.snapshot));
        self.store.notify_changed();

        metrics::record_updates_skipped(skipped);
        metrics::record_reload(event.kind.as_str(), keys);
        tracing::info!(
            event = %event.kind,
            config_map = ?event.name,
            keys,
            skipped,
            "ConfigMap configuration reloaded"
        );
    }

    fn on_watch_error(&self, error: &SourceError) -> WatchState {
        metrics::record_watch_failure(error.reason());

        if error.is_transport() {
            tracing::error!(error = %error, "ConfigMap polling error occurred, process needs to be restarted.");
            WatchState::Reconnecting
        } else {
            tracing::error!(error = %error, "ConfigMap watch delivered a malformed event, watch faulted.");
            WatchState::Faulted
        }
    }
}
