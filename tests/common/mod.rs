//! Shared utilities for provider integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use configmap_provider::config::ConfigMapSettings;
use configmap_provider::convert::{AcceptedSnapshot, FlatSnapshot};
use configmap_provider::source::{
    EventSource, EventStream, SourceError, WatchEvent, WatchEventKind, WatchTarget,
};
use configmap_provider::store::{ConfigurationStore, SharedConfiguration};

pub const CONFIG_MAP: &str = "app-settings";

/// Settings watching [`CONFIG_MAP`] without an initial sync wait.
pub fn settings() -> ConfigMapSettings {
    ConfigMapSettings {
        config_map_name: Some(CONFIG_MAP.to_string()),
        initial_sync_timeout_secs: 0,
        ..ConfigMapSettings::default()
    }
}

pub fn data(pairs: &[(&str, &str)]) -> FlatSnapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn accepted(pairs: &[(&str, &str)]) -> AcceptedSnapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Some(v.to_string())))
        .collect()
}

type Item = Result<WatchEvent, SourceError>;

/// Event source driven by the test through an [`EventFeed`].
///
/// Supports a single watch; further calls fail with a transport error.
pub struct ScriptedSource {
    events: Mutex<Option<mpsc::UnboundedReceiver<Item>>>,
    connect_error: Option<SourceError>,
    watch_calls: AtomicUsize,
    targets: Mutex<Vec<WatchTarget>>,
}

impl ScriptedSource {
    pub fn new() -> (Arc<Self>, EventFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            events: Mutex::new(Some(rx)),
            connect_error: None,
            watch_calls: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
        };
        (Arc::new(source), EventFeed { tx })
    }

    /// A source whose watch request always fails.
    pub fn failing(error: SourceError) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(None),
            connect_error: Some(error),
            watch_calls: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
        })
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<WatchTarget> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn watch(&self, target: &WatchTarget) -> Result<EventStream, SourceError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.clone());

        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }

        let rx = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SourceError::Transport("watch already consumed".into()))?;

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}

/// Sending half of a [`ScriptedSource`]. Dropping it ends the stream.
pub struct EventFeed {
    tx: mpsc::UnboundedSender<Item>,
}

impl EventFeed {
    pub fn send(&self, kind: WatchEventKind, pairs: &[(&str, &str)]) {
        let event = WatchEvent::new(kind, Some(CONFIG_MAP.to_string()), data(pairs));
        let _ = self.tx.send(Ok(event));
    }

    pub fn added(&self, pairs: &[(&str, &str)]) {
        self.send(WatchEventKind::Added, pairs);
    }

    pub fn modified(&self, pairs: &[(&str, &str)]) {
        self.send(WatchEventKind::Modified, pairs);
    }

    pub fn deleted(&self, pairs: &[(&str, &str)]) {
        self.send(WatchEventKind::Deleted, pairs);
    }

    pub fn bookmark(&self) {
        let _ = self.tx.send(Ok(WatchEvent::bookmark()));
    }

    pub fn fail(&self, error: SourceError) {
        let _ = self.tx.send(Err(error));
    }
}

/// Store that records every publish on top of a [`SharedConfiguration`].
#[derive(Default)]
pub struct RecordingStore {
    pub inner: SharedConfiguration,
    replaced: Mutex<Vec<Arc<AcceptedSnapshot>>>,
    notified: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publishes(&self) -> Vec<Arc<AcceptedSnapshot>> {
        self.replaced.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.replaced.lock().unwrap().len()
    }

    pub fn notify_count(&self) -> usize {
        self.notified.load(Ordering::SeqCst)
    }

    /// Wait until `count` snapshots have been published.
    pub async fn wait_for_publishes(&self, count: usize) {
        let mut version = self.inner.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.publish_count() < count {
                version.changed().await.unwrap();
            }
        })
        .await
        .expect("timed out waiting for a publish");
    }
}

impl ConfigurationStore for RecordingStore {
    fn replace(&self, snapshot: Arc<AcceptedSnapshot>) {
        self.replaced.lock().unwrap().push(Arc::clone(&snapshot));
        self.inner.replace(snapshot);
    }

    fn notify_changed(&self) {
        self.notified.fetch_add(1, Ordering::SeqCst);
        self.inner.notify_changed();
    }
}
