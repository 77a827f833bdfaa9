//! Live configuration backed by a Kubernetes ConfigMap.

pub mod config;
pub mod convert;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod source;
pub mod store;

pub use config::ConfigMapSettings;
pub use convert::{DataConverter, ReconcileMode};
pub use provider::{ConfigMapProvider, ProviderError, ProviderHandle, WatchState};
pub use source::{EventSource, KubeEventSource};
pub use store::{ConfigurationStore, SharedConfiguration};
