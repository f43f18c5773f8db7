//! Diagram cache data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gitdiagram_protocol::{CachedResult, Subject};

/// One cached diagram as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDiagram {
    /// Repository owner (lower-case).
    pub username: String,
    /// Repository name (lower-case).
    pub repo: String,
    /// Diagram source text.
    pub diagram: String,
    /// Explanation produced by the first generation phase.
    pub explanation: String,
    /// Component mapping produced by the second generation phase.
    pub mapping: String,
    /// Whether the generation ran on the user's own API key.
    #[serde(default)]
    pub used_own_key: bool,
    /// First time this repository was stored.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write.
    pub updated_at: DateTime<Utc>,
}

impl StoredDiagram {
    pub(crate) fn create(subject: &Subject, upsert: DiagramUpsert) -> Self {
        let now = Utc::now();
        Self {
            username: subject.owner().to_string(),
            repo: subject.repository().to_string(),
            diagram: upsert.diagram,
            explanation: upsert.explanation,
            mapping: upsert.mapping,
            used_own_key: upsert.used_own_key,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the payload, keeping `created_at`.
    pub(crate) fn apply(&mut self, upsert: DiagramUpsert) {
        self.diagram = upsert.diagram;
        self.explanation = upsert.explanation;
        self.mapping = upsert.mapping;
        self.used_own_key = upsert.used_own_key;
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn belongs_to(&self, subject: &Subject) -> bool {
        self.username == subject.owner() && self.repo == subject.repository()
    }
}

impl From<StoredDiagram> for CachedResult {
    fn from(stored: StoredDiagram) -> Self {
        CachedResult {
            diagram: stored.diagram,
            explanation: stored.explanation,
            mapping: stored.mapping,
            used_own_key: stored.used_own_key,
        }
    }
}

/// Payload of a cache write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramUpsert {
    pub diagram: String,
    pub explanation: String,
    pub mapping: String,
    pub used_own_key: bool,
}

impl DiagramUpsert {
    pub fn new(
        diagram: impl Into<String>,
        explanation: impl Into<String>,
        mapping: impl Into<String>,
    ) -> Self {
        Self {
            diagram: diagram.into(),
            explanation: explanation.into(),
            mapping: mapping.into(),
            used_own_key: false,
        }
    }

    pub fn used_own_key(mut self, used_own_key: bool) -> Self {
        self.used_own_key = used_own_key;
        self
    }
}

impl From<CachedResult> for DiagramUpsert {
    fn from(result: CachedResult) -> Self {
        Self {
            diagram: result.diagram,
            explanation: result.explanation,
            mapping: result.mapping,
            used_own_key: result.used_own_key,
        }
    }
}

/// Aggregate counts over the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramStats {
    pub total_diagrams: usize,
    pub own_key_users: usize,
    pub free_users: usize,
}
