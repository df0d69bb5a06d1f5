use serde::{Deserialize, Serialize};

/// The header line written at the top of serialized documents.
pub const DEFAULT_HEADER: &str = "#%RAML 0.8";

/// Controls how documents are loaded and written back out.
///
/// Deserializable so it can live in a caller's own configuration file;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RamlOptions {
    /// Replaces the YAML document marker in [`crate::Document::serialize`].
    pub header: String,
    /// Whether `!include` lines are expanded when loading from a file.
    pub expand_includes: bool,
}

impl Default for RamlOptions {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            expand_includes: true,
        }
    }
}
