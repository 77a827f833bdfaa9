//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse, split provider section from runtime sections)
//!     → validation.rs (semantic checks)
//!     → ProviderConfig (validated, immutable)
//!     → ConfigMapSettings handed to the provider at construction
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; the watched ConfigMap is the only
//!   thing that changes at runtime
//! - All fields have defaults to allow minimal configs
//! - A missing provider section is an error, not a default

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, DEFAULT_SETTINGS_SECTION};
pub use schema::{ConfigMapSettings, LogFormat, LoggingConfig, MetricsConfig, ProviderConfig, RuntimeConfig};
pub use validation::{validate_settings, ValidationError};
