//! Upstream event sources.
//!
//! # Data Flow
//! ```text
//! Kubernetes API server
//!     → kubernetes.rs (watch request, event translation, resume on expiry)
//!     → EventStream of Result<WatchEvent, SourceError>
//!     → provider watch worker
//! ```
//!
//! # Design Decisions
//! - The provider only knows the [`EventSource`] trait, so tests and other
//!   transports can stand in for the cluster
//! - An error item is terminal for the stream it appears on

pub mod kubernetes;
pub mod types;

pub use kubernetes::KubeEventSource;
pub use types::{EventSource, EventStream, SourceError, WatchEvent, WatchEventKind, WatchTarget};
