//! Configuration schema definitions.
//!
//! The provider settings live in their own named section so they can sit next
//! to an application's other settings. Process-level sections (`logging`,
//! `metrics`) are only read by the bundled binary.

use serde::{Deserialize, Serialize};

use crate::convert::{ReconcileMode, DEFAULT_KEY_DELIMITER};

/// Namespace watched when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Settings of a ConfigMap configuration provider.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigMapSettings {
    /// Namespace the ConfigMap lives in.
    pub namespace: String,

    /// Name of the ConfigMap to watch. All ConfigMaps of the namespace when unset.
    pub config_map_name: Option<String>,

    /// Refuse updates that change the inferred type of a value.
    pub safe_update: bool,

    /// Log and continue when the watch cannot be established.
    pub optional: bool,

    /// Hierarchy delimiter used in ConfigMap keys.
    pub key_delimiter: String,

    /// How long loading waits for the first event (0 = don't wait).
    pub initial_sync_timeout_secs: u64,
}

impl Default for ConfigMapSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            config_map_name: None,
            safe_update: false,
            optional: false,
            key_delimiter: DEFAULT_KEY_DELIMITER.to_string(),
            initial_sync_timeout_secs: 5,
        }
    }
}

impl ConfigMapSettings {
    pub fn reconcile_mode(&self) -> ReconcileMode {
        ReconcileMode::from_safe_update(self.safe_update)
    }
}

/// Process-level sections of a settings file.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Everything loaded from a settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub settings: ConfigMapSettings,
    pub runtime: RuntimeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ConfigMapSettings::default();
        assert_eq!(settings.namespace, "default");
        assert_eq!(settings.config_map_name, None);
        assert_eq!(settings.reconcile_mode(), ReconcileMode::Overwrite);
        assert!(!settings.optional);
        assert_eq!(settings.key_delimiter, "__");
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let settings: ConfigMapSettings = toml::from_str("safe_update = true").unwrap();
        assert!(settings.safe_update);
        assert_eq!(settings.reconcile_mode(), ReconcileMode::Safe);
        assert_eq!(settings.namespace, DEFAULT_NAMESPACE);
    }
}
