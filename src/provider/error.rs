//! Provider error definitions.

use thiserror::Error;

use crate::config::ValidationError;
use crate::source::SourceError;

/// Errors returned when constructing or loading a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Settings failed validation.
    #[error("invalid ConfigMap provider settings: {}", join_errors(.0))]
    InvalidSettings(Vec<ValidationError>),

    /// The watch request could not be established.
    #[error("failed to establish ConfigMap watch: {0}")]
    Connect(#[source] SourceError),

    /// The stream failed before the first event was processed.
    #[error("ConfigMap watch failed during initial sync: {0}")]
    Stream(#[source] SourceError),

    /// The stream ended before the first event was delivered.
    #[error("ConfigMap watch closed before delivering an event")]
    StreamClosed,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
