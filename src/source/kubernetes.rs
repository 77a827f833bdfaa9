//! Kubernetes-backed event source.
//!
//! # Responsibilities
//! - Open a ConfigMap watch scoped to a namespace and optional name
//! - Translate API watch events into [`WatchEvent`]s
//! - Resume the watch when the API server closes it at its request timeout
//!
//! # Design Decisions
//! - The first request starts at resource version "0", so the server replays
//!   the current state as `Added` events
//! - Bookmarks are requested to keep the resume point fresh on idle clusters
//! - A graceful close resumes from the last seen resource version; any error
//!   (transport, API error event, undecodable object) ends the stream

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, WatchEvent as KubeWatchEvent, WatchParams};
use kube::Client;

use crate::source::types::{EventSource, EventStream, SourceError, WatchEvent, WatchEventKind, WatchTarget};

/// Server-side duration of a single watch request. Must stay below 295s.
const WATCH_TIMEOUT_SECS: u32 = 290;

const INITIAL_RESOURCE_VERSION: &str = "0";

/// [`EventSource`] talking to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeEventSource {
    client: Client,
}

impl KubeEventSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient configuration (in-cluster or kubeconfig).
    pub async fn try_default() -> Result<Self, SourceError> {
        Client::try_default()
            .await
            .map(Self::new)
            .map_err(map_kube_error)
    }
}

#[async_trait]
impl EventSource for KubeEventSource {
    async fn watch(&self, target: &WatchTarget) -> Result<EventStream, SourceError> {
        let request = ApiWatch {
            api: Api::namespaced(self.client.clone(), &target.namespace),
            params: watch_params(target),
        };
        let events = request.open(INITIAL_RESOURCE_VERSION).await?;

        tracing::debug!(
            namespace = %target.namespace,
            config_map = ?target.name,
            "ConfigMap watch established"
        );

        Ok(WatchCursor::new(request, events).into_stream())
    }
}

pub(crate) fn watch_params(target: &WatchTarget) -> WatchParams {
    let mut params = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
    params.bookmarks = true;
    if let Some(selector) = target.field_selector() {
        params = params.fields(&selector);
    }
    params
}

fn map_kube_error(error: kube::Error) -> SourceError {
    match error {
        kube::Error::SerdeError(e) => SourceError::Malformed(e.to_string()),
        kube::Error::Api(response) => SourceError::Api {
            code: response.code,
            message: response.message,
        },
        other => SourceError::Transport(other.to_string()),
    }
}

type KubeEvents = BoxStream<'static, kube::Result<KubeWatchEvent<ConfigMap>>>;

/// A single watch request starting at a resource version.
#[async_trait]
trait WatchRequest: Send + Sync + 'static {
    async fn open(&self, resource_version: &str) -> Result<KubeEvents, SourceError>;
}

struct ApiWatch {
    api: Api<ConfigMap>,
    params: WatchParams,
}

#[async_trait]
impl WatchRequest for ApiWatch {
    async fn open(&self, resource_version: &str) -> Result<KubeEvents, SourceError> {
        let events = self
            .api
            .watch(&self.params, resource_version)
            .await
            .map_err(map_kube_error)?;
        Ok(events.boxed())
    }
}

/// Chains watch requests into one stream, resuming after each graceful close.
struct WatchCursor<R> {
    request: R,
    resource_version: String,
    events: Option<KubeEvents>,
    finished: bool,
}

impl<R: WatchRequest> WatchCursor<R> {
    fn new(request: R, events: KubeEvents) -> Self {
        Self {
            request,
            resource_version: INITIAL_RESOURCE_VERSION.to_string(),
            events: Some(events),
            finished: false,
        }
    }

    fn into_stream(self) -> EventStream {
        stream::unfold(self, |mut cursor| async move {
            if cursor.finished {
                return None;
            }
            let item = cursor.next_event().await;
            cursor.finished = item.is_err();
            Some((item, cursor))
        })
        .boxed()
    }

    async fn next_event(&mut self) -> Result<WatchEvent, SourceError> {
        loop {
            if self.events.is_none() {
                tracing::debug!(
                    resource_version = %self.resource_version,
                    "ConfigMap watch request expired, resuming"
                );
                self.events = Some(self.request.open(&self.resource_version).await?);
            }
            let Some(events) = self.events.as_mut() else {
                continue;
            };

            match events.next().await {
                Some(Ok(event)) => return translate(&mut self.resource_version, event),
                Some(Err(e)) => return Err(map_kube_error(e)),
                None => self.events = None,
            }
        }
    }
}

/// Convert an API watch event, advancing `resource_version` past it.
fn translate(
    resource_version: &mut String,
    event: KubeWatchEvent<ConfigMap>,
) -> Result<WatchEvent, SourceError> {
    match event {
        KubeWatchEvent::Added(config_map) => Ok(content(resource_version, WatchEventKind::Added, config_map)),
        KubeWatchEvent::Modified(config_map) => {
            Ok(content(resource_version, WatchEventKind::Modified, config_map))
        }
        KubeWatchEvent::Deleted(config_map) => {
            Ok(content(resource_version, WatchEventKind::Deleted, config_map))
        }
        KubeWatchEvent::Bookmark(bookmark) => {
            *resource_version = bookmark.metadata.resource_version;
            Ok(WatchEvent::bookmark())
        }
        KubeWatchEvent::Error(response) => Err(SourceError::Api {
            code: response.code,
            message: response.message,
        }),
    }
}

fn content(resource_version: &mut String, kind: WatchEventKind, config_map: ConfigMap) -> WatchEvent {
    let ConfigMap { metadata, data, .. } = config_map;
    if let Some(version) = metadata.resource_version {
        *resource_version = version;
    }
    WatchEvent::new(kind, metadata.name, data.unwrap_or_default())
}
