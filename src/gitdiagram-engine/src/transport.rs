//! Collaborator interfaces used by the session controller.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use gitdiagram_protocol::{CachedResult, CostEstimate, GenerateRequest, Subject};

use crate::error::Result;

/// Raw bytes of a generation stream, in arrival order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Opens generation streams.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Start a generation. Dropping the returned stream releases the
    /// underlying connection.
    async fn open(&self, request: &GenerateRequest) -> Result<ByteStream>;
}

/// Estimates what a generation would cost.
#[async_trait]
pub trait CostEstimator: Send + Sync {
    /// Failures the server reports in-band come back as
    /// `Ok(CostEstimate { error: Some(..), .. })`.
    async fn estimate(&self, request: &GenerateRequest) -> Result<CostEstimate>;
}

/// Stores finished generations keyed by subject.
#[async_trait]
pub trait DiagramCache: Send + Sync {
    async fn lookup(&self, subject: &Subject) -> Result<Option<CachedResult>>;

    /// Upsert: replaces any previous entry for `subject`.
    async fn store(&self, subject: &Subject, result: CachedResult) -> Result<()>;
}

/// Reports when a subject's diagram was last written.
#[async_trait]
pub trait LastGeneratedLookup: Send + Sync {
    async fn last_generated(&self, subject: &Subject) -> Result<Option<DateTime<Utc>>>;
}
