//! Generated-diagram cache.
//!
//! - [`types`] - stored document and upsert payload
//! - [`storage`] - lookup, upsert, listing and statistics

mod storage;
#[cfg(test)]
mod tests;
mod types;

pub use storage::DiagramStorage;
pub use types::{DiagramStats, DiagramUpsert, StoredDiagram};
