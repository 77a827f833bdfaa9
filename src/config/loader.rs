//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{ConfigMapSettings, ProviderConfig, RuntimeConfig};
use crate::config::validation::{validate_runtime, validate_settings, ValidationError};

/// Section holding the provider settings unless another one is requested.
pub const DEFAULT_SETTINGS_SECTION: &str = "config_map";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    MissingSection(String),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::MissingSection(section) => {
                write!(f, "Settings section '{}' not found", section)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path, section: &str) -> Result<ProviderConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content, section)
}

/// Parse and validate configuration from TOML text.
///
/// The provider settings are taken from `section`, which must exist; the
/// remaining tables feed the process-level configuration.
pub fn parse_config(content: &str, section: &str) -> Result<ProviderConfig, ConfigError> {
    let mut table: toml::Table = toml::from_str(content).map_err(ConfigError::Parse)?;

    let settings: ConfigMapSettings = table
        .remove(section)
        .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?
        .try_into()
        .map_err(ConfigError::Parse)?;
    let runtime: RuntimeConfig = toml::Value::Table(table)
        .try_into()
        .map_err(ConfigError::Parse)?;

    let mut errors = Vec::new();
    if let Err(e) = validate_settings(&settings) {
        errors.extend(e);
    }
    if let Err(e) = validate_runtime(&runtime) {
        errors.extend(e);
    }
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(ProviderConfig { settings, runtime })
}
