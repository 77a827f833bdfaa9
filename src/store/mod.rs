//! In-process configuration store.
//!
//! # Data Flow
//! ```text
//! watch worker (single writer)
//!     → replace(Arc<AcceptedSnapshot>)   atomic pointer swap
//!     → notify_changed()                 version bump on a watch channel
//!
//! consumers (any number of readers)
//!     → get / get_as / section            lock-free loads
//!     → subscribe()                       await the next version
//! ```
//!
//! # Design Decisions
//! - Readers see either the previous or the next snapshot, never a mix
//! - The provider never reads the store back; its own copy is authoritative

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::convert::{AcceptedSnapshot, PATH_DELIMITER};

/// Destination of reconciled snapshots.
pub trait ConfigurationStore: Send + Sync + 'static {
    /// Replace the whole configuration.
    fn replace(&self, snapshot: Arc<AcceptedSnapshot>);

    /// Tell subscribers the configuration changed.
    fn notify_changed(&self);
}

/// Shared, hot-swappable configuration tree.
pub struct SharedConfiguration {
    data: ArcSwap<AcceptedSnapshot>,
    version: watch::Sender<u64>,
}

impl SharedConfiguration {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            data: ArcSwap::from_pointee(AcceptedSnapshot::new()),
            version,
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<AcceptedSnapshot> {
        self.data.load_full()
    }

    /// Value at `path`, if present and set.
    pub fn get(&self, path: &str) -> Option<String> {
        self.data.load().get(path).cloned().flatten()
    }

    /// Value at `path` parsed as `T`.
    ///
    /// `Ok(None)` when the path has no value.
    pub fn get_as<T: FromStr>(&self, path: &str) -> Result<Option<T>, T::Err> {
        self.get(path).map(|value| value.parse()).transpose()
    }

    /// Entries below `prefix`, keyed by their path relative to it.
    ///
    /// `section("Logging")` returns `Level:Default` for `Logging:Level:Default`.
    pub fn section(&self, prefix: &str) -> BTreeMap<String, Option<String>> {
        let lead = format!("{}{}", prefix, PATH_DELIMITER);
        let data = self.data.load();
        data.range(lead.clone()..)
            .take_while(|(path, _)| path.starts_with(&lead))
            .map(|(path, value)| (path[lead.len()..].to_string(), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.load().is_empty()
    }

    /// Number of change notifications so far.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Receiver that resolves on every change notification.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

impl Default for SharedConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationStore for SharedConfiguration {
    fn replace(&self, snapshot: Arc<AcceptedSnapshot>) {
        self.data.store(snapshot);
    }

    fn notify_changed(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
