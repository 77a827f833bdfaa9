//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check Kubernetes object name rules for namespace and ConfigMap name
//! - Reject key delimiters that would make normalization ambiguous
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: settings → Result<(), Vec<ValidationError>>
//! - Runs before a provider is constructed

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{ConfigMapSettings, RuntimeConfig};
use crate::convert::PATH_DELIMITER;

const MAX_LABEL_LEN: usize = 63;
const MAX_SUBDOMAIN_LEN: usize = 253;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("namespace '{0}' is not a valid RFC 1123 label")]
    InvalidNamespace(String),

    #[error("config_map_name '{0}' is not a valid RFC 1123 subdomain")]
    InvalidConfigMapName(String),

    #[error("key_delimiter must not be empty")]
    EmptyKeyDelimiter,

    #[error("key_delimiter '{0}' must not contain the path delimiter ':'")]
    AmbiguousKeyDelimiter(String),

    #[error("metrics address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Validate provider settings.
pub fn validate_settings(settings: &ConfigMapSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.namespace.is_empty() {
        errors.push(ValidationError::EmptyNamespace);
    } else if !is_rfc1123_label(&settings.namespace) {
        errors.push(ValidationError::InvalidNamespace(settings.namespace.clone()));
    }

    if let Some(name) = &settings.config_map_name {
        if !is_rfc1123_subdomain(name) {
            errors.push(ValidationError::InvalidConfigMapName(name.clone()));
        }
    }

    if settings.key_delimiter.is_empty() {
        errors.push(ValidationError::EmptyKeyDelimiter);
    } else if settings.key_delimiter.contains(PATH_DELIMITER) {
        errors.push(ValidationError::AmbiguousKeyDelimiter(settings.key_delimiter.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the process-level sections.
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if runtime.metrics.enabled && runtime.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(runtime.metrics.address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_rfc1123_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    let edge_ok = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    !bytes.is_empty()
        && bytes.len() <= MAX_LABEL_LEN
        && bytes.first().is_some_and(edge_ok)
        && bytes.last().is_some_and(edge_ok)
        && bytes.iter().all(|b| edge_ok(b) || *b == b'-')
}

fn is_rfc1123_subdomain(value: &str) -> bool {
    value.len() <= MAX_SUBDOMAIN_LEN && value.split('.').all(is_rfc1123_label)
}
