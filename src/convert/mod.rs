//! ConfigMap data conversion.
//!
//! # Data Flow
//! ```text
//! ConfigMap data (flat, "Foo__Bar" = "1")
//!     → key_path.rs (normalize "Foo__Bar" → "Foo:Bar")
//!     → reconcile.rs (overwrite, or safe merge against current snapshot)
//!         → infer.rs (kind of the current value, strict re-parse of new value)
//!     → AcceptedSnapshot ("Foo:Bar" = "1")
//! ```
//!
//! # Design Decisions
//! - Nothing in this module performs I/O or holds state between calls
//! - Inferred values are only a comparison aid and are never stored

use std::collections::BTreeMap;

pub mod infer;
pub mod key_path;
pub mod reconcile;

pub use infer::{infer, PrimitiveKind, PrimitiveValue};
pub use key_path::{KeyPathNormalizer, DEFAULT_KEY_DELIMITER, PATH_DELIMITER};
pub use reconcile::{Conflict, DataConverter, KeyOutcome, ReconcileMode, Reconciliation};

/// Raw ConfigMap data as delivered by the cluster.
pub type FlatSnapshot = BTreeMap<String, String>;

/// Normalized configuration paths to values, as exposed to consumers.
pub type AcceptedSnapshot = BTreeMap<String, Option<String>>;
