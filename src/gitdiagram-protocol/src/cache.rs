//! Cached generation results.

use serde::{Deserialize, Serialize};

/// A finished generation as held by the result cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResult {
    pub diagram: String,
    pub explanation: String,
    pub mapping: String,
    /// Whether the generation ran on the user's own API key.
    #[serde(default)]
    pub used_own_key: bool,
}

impl CachedResult {
    pub fn new(
        diagram: impl Into<String>,
        explanation: impl Into<String>,
        mapping: impl Into<String>,
        used_own_key: bool,
    ) -> Self {
        Self {
            diagram: diagram.into(),
            explanation: explanation.into(),
            mapping: mapping.into(),
            used_own_key,
        }
    }

    /// An entry without diagram text cannot short-circuit a generation.
    pub fn has_diagram(&self) -> bool {
        !self.diagram.trim().is_empty()
    }
}
