//! Key path normalization.
//!
//! ConfigMap keys cannot contain `:`, so hierarchy is spelled with a
//! source delimiter (`__` by default) and rewritten into the configuration
//! tree's path syntax before it reaches consumers.

/// Hierarchy delimiter used by ConfigMap keys unless configured otherwise.
pub const DEFAULT_KEY_DELIMITER: &str = "__";

/// Path delimiter of the in-process configuration tree.
pub const PATH_DELIMITER: &str = ":";

/// Maps flat external keys onto hierarchical configuration paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPathNormalizer {
    source_delimiter: String,
}

impl KeyPathNormalizer {
    /// Create a normalizer for the given source delimiter.
    pub fn new(source_delimiter: impl Into<String>) -> Self {
        Self {
            source_delimiter: source_delimiter.into(),
        }
    }

    /// The delimiter recognized in external keys.
    pub fn source_delimiter(&self) -> &str {
        &self.source_delimiter
    }

    /// Replace every source delimiter in `key` with [`PATH_DELIMITER`].
    ///
    /// No other transformation is applied: case and whitespace are kept.
    pub fn normalize(&self, key: &str) -> String {
        // An empty pattern would match between every char.
        if self.source_delimiter.is_empty() {
            return key.to_string();
        }
        key.replace(&self.source_delimiter, PATH_DELIMITER)
    }
}

impl Default for KeyPathNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_DELIMITER)
    }
}
