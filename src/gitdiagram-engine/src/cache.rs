//! Result cache bridge.
//!
//! Adapts the [`DiagramCache`] collaborator to what a session needs: lookups
//! that never fail (an error is a miss) and stores whose failures are logged
//! and otherwise ignored.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use gitdiagram_protocol::{CachedResult, Subject};
use gitdiagram_storage::{DiagramStorage, DiagramUpsert};

use crate::error::Result;
use crate::state::GenerationState;
use crate::transport::{DiagramCache, LastGeneratedLookup};

/// Shown on a cache hit whose entry has no explanation.
pub const CACHED_EXPLANATION_PLACEHOLDER: &str = "Cached explanation not found.";
/// Shown on a cache hit whose entry has no mapping.
pub const CACHED_MAPPING_PLACEHOLDER: &str = "Cached mapping not found.";
/// Stored when a completed generation produced no explanation.
pub const MISSING_EXPLANATION: &str = "No explanation provided";
/// Stored when a completed generation produced no mapping.
pub const MISSING_MAPPING: &str = "No mapping provided";

#[derive(Clone)]
pub struct ResultCacheBridge {
    cache: Arc<dyn DiagramCache>,
}

impl ResultCacheBridge {
    pub fn new(cache: Arc<dyn DiagramCache>) -> Self {
        Self { cache }
    }

    /// Cached result for `subject`. Failures and entries without diagram
    /// text count as misses.
    pub async fn lookup(&self, subject: &Subject) -> Option<CachedResult> {
        match self.cache.lookup(subject).await {
            Ok(Some(cached)) if cached.has_diagram() => {
                debug!(subject = %subject, "Cache hit");
                Some(cached)
            }
            Ok(Some(_)) => {
                debug!(subject = %subject, "Cached entry has no diagram, treating as miss");
                None
            }
            Ok(None) => {
                debug!(subject = %subject, "Cache miss");
                None
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Upsert a finished generation. Returns whether it was persisted.
    pub async fn store(
        &self,
        subject: &Subject,
        diagram: &str,
        explanation: &str,
        mapping: &str,
        used_own_key: bool,
    ) -> bool {
        let result = CachedResult::new(
            diagram,
            or_placeholder(explanation, MISSING_EXPLANATION),
            or_placeholder(mapping, MISSING_MAPPING),
            used_own_key,
        );

        match self.cache.store(subject, result).await {
            Ok(()) => {
                debug!(subject = %subject, used_own_key, "Cached generation");
                true
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "Failed to cache generation");
                false
            }
        }
    }

    /// Store a completed state. States without a final diagram are skipped.
    pub async fn store_completed(
        &self,
        subject: &Subject,
        state: &GenerationState,
        used_own_key: bool,
    ) -> bool {
        let diagram = match state.final_diagram.as_deref() {
            Some(diagram) if state.is_complete() && !diagram.trim().is_empty() => diagram,
            _ => {
                warn!(subject = %subject, phase = %state.phase, "Not caching generation without a final diagram");
                return false;
            }
        };
        self.store(
            subject,
            diagram,
            state.explanation.as_str(),
            state.mapping.as_str(),
            used_own_key,
        )
        .await
    }
}

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        text
    }
}

#[async_trait]
impl DiagramCache for DiagramStorage {
    async fn lookup(&self, subject: &Subject) -> Result<Option<CachedResult>> {
        Ok(self.get(subject).await?.map(CachedResult::from))
    }

    async fn store(&self, subject: &Subject, result: CachedResult) -> Result<()> {
        self.upsert(subject, DiagramUpsert::from(result)).await?;
        Ok(())
    }
}

#[async_trait]
impl LastGeneratedLookup for DiagramStorage {
    async fn last_generated(&self, subject: &Subject) -> Result<Option<DateTime<Utc>>> {
        Ok(DiagramStorage::last_generated(self, subject).await?)
    }
}
