//! Watch event types and the event source contract.

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::convert::FlatSnapshot;

/// Kind of change reported by the upstream watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Added,
    Modified,
    Deleted,
    /// Resource version marker without content.
    Bookmark,
    /// Anything the source could not classify.
    Unknown,
}

impl WatchEventKind {
    /// Whether events of this kind carry ConfigMap content to reconcile.
    pub fn carries_content(self) -> bool {
        matches!(
            self,
            WatchEventKind::Added | WatchEventKind::Modified | WatchEventKind::Deleted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WatchEventKind::Added => "added",
            WatchEventKind::Modified => "modified",
            WatchEventKind::Deleted => "deleted",
            WatchEventKind::Bookmark => "bookmark",
            WatchEventKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One delivered watch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    /// Name of the ConfigMap the event is about, when known.
    pub name: Option<String>,
    /// Full data of the ConfigMap. Empty for kinds without content.
    pub data: FlatSnapshot,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, name: Option<String>, data: FlatSnapshot) -> Self {
        Self { kind, name, data }
    }

    pub fn bookmark() -> Self {
        Self::new(WatchEventKind::Bookmark, None, FlatSnapshot::new())
    }

    pub fn unknown() -> Self {
        Self::new(WatchEventKind::Unknown, None, FlatSnapshot::new())
    }
}

/// What to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub namespace: String,
    /// Restrict the watch to a single ConfigMap.
    pub name: Option<String>,
}

impl WatchTarget {
    /// Server-side field selector restricting the watch to [`Self::name`].
    pub fn field_selector(&self) -> Option<String> {
        self.name.as_ref().map(|name| format!("metadata.name={}", name))
    }
}

/// Errors surfaced by an event source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The connection failed or dropped.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API server sent an error event (e.g. 410 Gone).
    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },

    /// An event could not be decoded.
    #[error("malformed event: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Failures of the stream itself, as opposed to bad event content.
    pub fn is_transport(&self) -> bool {
        matches!(self, SourceError::Transport(_) | SourceError::Api { .. })
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SourceError::Transport(_) => "transport",
            SourceError::Api { .. } => "api",
            SourceError::Malformed(_) => "malformed",
        }
    }
}

/// Stream of watch events. An `Err` item ends the watch attempt.
pub type EventStream = BoxStream<'static, Result<WatchEvent, SourceError>>;

/// Upstream delivering ConfigMap change events.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Open a watch on `target`.
    ///
    /// Resolves once the watch request is established; events follow on the
    /// returned stream in delivery order.
    async fn watch(&self, target: &WatchTarget) -> Result<EventStream, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_selector_only_for_named_target() {
        let mut target = WatchTarget {
            namespace: "default".into(),
            name: None,
        };
        assert_eq!(target.field_selector(), None);

        target.name = Some("app-config".into());
        assert_eq!(target.field_selector().as_deref(), Some("metadata.name=app-config"));
    }

    #[test]
    fn test_content_kinds() {
        assert!(WatchEventKind::Added.carries_content());
        assert!(WatchEventKind::Modified.carries_content());
        assert!(WatchEventKind::Deleted.carries_content());
        assert!(!WatchEventKind::Bookmark.carries_content());
        assert!(!WatchEventKind::Unknown.carries_content());
    }

    #[test]
    fn test_error_classification() {
        assert!(SourceError::Transport("reset".into()).is_transport());
        assert!(SourceError::Api { code: 410, message: "Gone".into() }.is_transport());
        assert!(!SourceError::Malformed("bad json".into()).is_transport());
        assert_eq!(
            SourceError::Api { code: 410, message: "Gone".into() }.to_string(),
            "API error 410: Gone"
        );
    }
}
