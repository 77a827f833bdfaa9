//! ConfigMap configuration provider.
//!
//! # Data Flow
//! ```text
//! ConfigMapProvider::new (validate settings, build converter)
//!     → load()
//!         → worker.rs connect (watch request + initial event)
//!         → tokio::spawn(worker.rs run)
//!     → ProviderHandle (state, wait, shutdown)
//!
//! Background task, per event:
//!     Added | Modified | Deleted → reconcile → store.replace → notify
//!     Bookmark | Unknown         → trace and ignore
//!     Err                        → Reconnecting or Faulted, task exits
//! ```
//!
//! # Design Decisions
//! - `load()` resolves after the initial connect attempt; everything after
//!   the first event happens on a background task
//! - No inline reconnect: a failed stream ends the watch and restarting is
//!   left to process supervision
//! - Optional providers log establishment failures and keep an empty snapshot
//! - Dropping the handle cancels the watch

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{validate_settings, ConfigMapSettings};
use crate::convert::{DataConverter, KeyPathNormalizer};
use crate::lifecycle::Shutdown;
use crate::source::{EventSource, WatchTarget};
use crate::store::ConfigurationStore;

pub mod error;
pub mod state;
mod worker;

pub use error::ProviderError;
pub use state::WatchState;

use worker::WatchWorker;

/// Keeps a configuration store in sync with a watched ConfigMap.
pub struct ConfigMapProvider<S, C> {
    settings: ConfigMapSettings,
    source: Arc<S>,
    store: Arc<C>,
    converter: DataConverter,
}

impl<S, C> ConfigMapProvider<S, C>
where
    S: EventSource,
    C: ConfigurationStore,
{
    /// Create a provider.
    ///
    /// Fails if `settings` do not pass validation.
    pub fn new(settings: ConfigMapSettings, source: Arc<S>, store: Arc<C>) -> Result<Self, ProviderError> {
        validate_settings(&settings).map_err(ProviderError::InvalidSettings)?;

        let converter = DataConverter::new(
            settings.reconcile_mode(),
            KeyPathNormalizer::new(settings.key_delimiter.clone()),
        );

        Ok(Self {
            settings,
            source,
            store,
            converter,
        })
    }

    pub fn target(&self) -> WatchTarget {
        WatchTarget {
            namespace: self.settings.namespace.clone(),
            name: self.settings.config_map_name.clone(),
        }
    }

    /// Start watching.
    ///
    /// Resolves once the watch is established and the first event, if it
    /// arrives within `initial_sync_timeout_secs`, has been published. Later
    /// events are processed in the background.
    ///
    /// Establishment failures are returned as errors unless the provider is
    /// optional, in which case they are logged and the returned handle is
    /// already [`WatchState::Faulted`].
    pub async fn load(self) -> Result<ProviderHandle, ProviderError> {
        let target = self.target();
        let Self {
            settings,
            source,
            store,
            converter,
        } = self;

        tracing::trace!(
            namespace = %target.namespace,
            config_map = ?target.name,
            safe_update = settings.safe_update,
            "ConfigMap changes polling initiated."
        );

        let shutdown = Shutdown::new();
        let (state_tx, state_rx) = watch::channel(WatchState::Idle);
        let mut worker = WatchWorker::new(converter, store, shutdown.clone(), state_tx);
        let initial_sync = Duration::from_secs(settings.initial_sync_timeout_secs);

        match worker.connect(source.as_ref(), &target, initial_sync).await {
            Ok(events) => {
                let task = tokio::spawn(worker.run(events));
                Ok(ProviderHandle::new(shutdown, state_rx, Some(task)))
            }
            Err(error) if settings.optional => {
                tracing::error!(
                    error = %error,
                    "ConfigMap polling failed to start, skipping as it's optional."
                );
                worker.set_state(WatchState::Faulted);
                Ok(ProviderHandle::new(shutdown, state_rx, None))
            }
            Err(error) => {
                worker.set_state(WatchState::Faulted);
                Err(error)
            }
        }
    }
}

/// Owner's handle on a loaded provider.
///
/// Dropping the handle cancels the watch.
pub struct ProviderHandle {
    shutdown: Shutdown,
    state: watch::Receiver<WatchState>,
    task: Option<JoinHandle<WatchState>>,
}

impl ProviderHandle {
    fn new(shutdown: Shutdown, state: watch::Receiver<WatchState>, task: Option<JoinHandle<WatchState>>) -> Self {
        Self { shutdown, state, task }
    }

    /// Current watch state.
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<WatchState> {
        self.state.clone()
    }

    /// Whether the background task is still consuming events.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the watch to end and return its final state.
    pub async fn wait(&mut self) -> WatchState {
        match self.task.take() {
            Some(task) => match task.await {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!(error = %e, "ConfigMap watch task failed");
                    WatchState::Faulted
                }
            },
            None => self.state(),
        }
    }

    /// Cancel the watch and wait for the worker to exit.
    pub async fn shutdown(mut self) -> WatchState {
        self.shutdown.trigger();
        self.wait().await
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
