//! GitDiagram Storage - local, OS-aware storage for generated diagrams.
//!
//! Storage roots per platform:
//!
//! - **Windows**: `%APPDATA%\GitDiagram\`
//! - **macOS**: `~/Library/Application Support/GitDiagram/`
//! - **Linux**: `~/.local/share/GitDiagram/`
//!
//! Each generated diagram is kept as one JSON document per repository.
//! Writes are upserts: the latest generation replaces the previous one and
//! refreshes `updated_at`, which doubles as the "last generated" timestamp.
//!
//! # Usage
//!
//! ```rust,no_run
//! use gitdiagram_storage::{DiagramStorage, DiagramUpsert};
//! use gitdiagram_protocol::Subject;
//!
//! #[tokio::main]
//! async fn main() -> gitdiagram_storage::Result<()> {
//!     let storage = DiagramStorage::new()?;
//!     storage.init().await?;
//!
//!     let subject: Subject = "fastapi/fastapi".parse().expect("valid subject");
//!     storage
//!         .upsert(&subject, DiagramUpsert::new("flowchart TD", "explanation", "mapping"))
//!         .await?;
//!
//!     let last = storage.last_generated(&subject).await?;
//!     println!("Last generated: {:?}", last);
//!     Ok(())
//! }
//! ```

pub mod diagrams;
pub mod error;
pub mod paths;

// Re-export main types at crate root
pub use diagrams::{DiagramStats, DiagramStorage, DiagramUpsert, StoredDiagram};
pub use error::{Result, StorageError};
pub use paths::{GitDiagramPaths, gitdiagram_data_dir};
