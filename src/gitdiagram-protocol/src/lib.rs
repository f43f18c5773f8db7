//! GitDiagram Protocol - types shared between the generation backend and its clients
//!
//! This crate defines the streamed generation protocol: the wire record sent
//! on every `data: ` line, the typed [`Frame`] it is validated into, the
//! ordered [`Phase`] set a generation moves through, and the request and
//! cache payloads exchanged with the backend collaborators.

pub mod cache;
pub mod frame;
pub mod phase;
pub mod request;
pub mod subject;

#[cfg(test)]
mod tests;

// Re-exports
pub use cache::CachedResult;
pub use frame::{DATA_PREFIX, Frame, FrameError, StreamMessage};
pub use phase::{Artifact, Phase};
pub use request::{CostEstimate, GenerateRequest};
pub use subject::{Subject, SubjectParseError};
