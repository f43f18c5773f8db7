//! GitDiagram Engine - client side of streamed diagram generation
//!
//! A generation is requested for a repository [`Subject`] and streamed back
//! as `data: ` lines. The engine:
//!
//! - decodes the byte stream into typed frames ([`parser`]),
//! - accumulates the explanation, mapping and diagram text ([`accumulator`]),
//! - folds frames into a forward-only [`GenerationState`] ([`machine`]),
//! - orchestrates cache lookups, cost estimates and streams per session
//!   ([`session`]), writing finished results through the cache bridge
//!   ([`cache`]).
//!
//! Collaborators are traits ([`transport`]); [`BackendClient`] implements the
//! HTTP ones and `gitdiagram-storage` the cache ones.
//!
//! [`Subject`]: gitdiagram_protocol::Subject

pub mod accumulator;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod machine;
pub mod parser;
pub mod session;
pub mod state;
pub mod transport;

#[cfg(test)]
mod tests;

// Re-exports
pub use accumulator::Accumulator;
pub use cache::ResultCacheBridge;
pub use client::BackendClient;
pub use config::GitDiagramConfig;
pub use error::{DiagramError, Result};
pub use machine::{PhaseMachine, Transition};
pub use parser::{FrameDecoder, frames};
pub use session::{Collaborators, SessionController, SessionSnapshot};
pub use state::GenerationState;
pub use transport::{
    ByteStream, CostEstimator, DiagramCache, GenerationTransport, LastGeneratedLookup,
};
