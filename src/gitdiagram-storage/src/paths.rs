//! OS-aware path detection for GitDiagram storage.
//!
//! The data root is chosen per platform and can be overridden with
//! `GITDIAGRAM_DATA_DIR` (useful for containers and tests):
//!
//! - **Windows**: `%APPDATA%\GitDiagram\`
//! - **macOS**: `~/Library/Application Support/GitDiagram/`
//! - **Linux**: `~/.local/share/GitDiagram/`

use std::path::PathBuf;
use tracing::debug;

use gitdiagram_protocol::Subject;

use crate::error::{Result, StorageError};

/// Application name used for storage directories.
pub const APP_NAME: &str = "GitDiagram";

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "GITDIAGRAM_DATA_DIR";

/// Subdirectory names.
pub const DIAGRAMS_DIR: &str = "diagrams";
pub const LOGS_DIR: &str = "logs";

/// GitDiagram storage paths container.
#[derive(Debug, Clone)]
pub struct GitDiagramPaths {
    /// Root data directory (platform-specific).
    pub data_dir: PathBuf,
    /// One JSON document per cached repository.
    pub diagrams_dir: PathBuf,
    /// Logs directory.
    pub logs_dir: PathBuf,
}

impl GitDiagramPaths {
    /// Create paths with automatic OS detection.
    pub fn new() -> Result<Self> {
        let data_dir = gitdiagram_data_dir()?;
        Ok(Self::from_root(data_dir))
    }

    /// Create paths from a custom root directory.
    pub fn from_root(data_dir: PathBuf) -> Self {
        Self {
            diagrams_dir: data_dir.join(DIAGRAMS_DIR),
            logs_dir: data_dir.join(LOGS_DIR),
            data_dir,
        }
    }

    /// Ensure all directories exist.
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::create_dir_all(&self.diagrams_dir).await?;
        tokio::fs::create_dir_all(&self.logs_dir).await?;
        debug!(data_dir = %self.data_dir.display(), "GitDiagram storage directories initialized");
        Ok(())
    }

    /// Path of the cache document for a subject.
    ///
    /// `@` cannot occur in a validated owner or repository name, so the
    /// file name is unambiguous and never escapes `diagrams_dir`.
    pub fn diagram_path(&self, subject: &Subject) -> PathBuf {
        self.diagrams_dir.join(format!(
            "{}@{}.json",
            subject.owner(),
            subject.repository()
        ))
    }
}

/// Get the GitDiagram data directory based on the current OS.
pub fn gitdiagram_data_dir() -> Result<PathBuf> {
    if let Ok(val) = std::env::var(DATA_DIR_ENV) {
        if !val.is_empty() {
            let path = PathBuf::from(val);
            debug!(path = %path.display(), "Using GITDIAGRAM_DATA_DIR override");
            return Ok(path);
        }
    }

    let base = dirs::data_dir().ok_or(StorageError::HomeDirNotFound)?;
    Ok(base.join(APP_NAME))
}
