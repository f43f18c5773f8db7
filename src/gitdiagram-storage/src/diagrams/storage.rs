//! Diagram cache storage operations.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use gitdiagram_protocol::Subject;

use crate::error::{Result, StorageError};
use crate::paths::GitDiagramPaths;

use super::types::{DiagramStats, DiagramUpsert, StoredDiagram};

/// File-backed diagram cache, one JSON document per repository.
#[derive(Debug)]
pub struct DiagramStorage {
    paths: GitDiagramPaths,
    /// Serializes read-modify-write upserts within the process.
    write_lock: Mutex<()>,
}

impl DiagramStorage {
    /// Create a new diagram storage with automatic path detection.
    pub fn new() -> Result<Self> {
        let paths = GitDiagramPaths::new()?;
        Ok(Self::with_paths(paths))
    }

    /// Create diagram storage with custom paths.
    pub fn with_paths(paths: GitDiagramPaths) -> Self {
        Self {
            paths,
            write_lock: Mutex::new(()),
        }
    }

    /// Initialize storage (create directories).
    pub async fn init(&self) -> Result<()> {
        self.paths.ensure_dirs().await?;
        info!(data_dir = %self.paths.data_dir.display(), "Diagram storage initialized");
        Ok(())
    }

    /// Get the underlying paths.
    pub fn paths(&self) -> &GitDiagramPaths {
        &self.paths
    }

    /// Look up the cached diagram for a subject.
    pub async fn get(&self, subject: &Subject) -> Result<Option<StoredDiagram>> {
        let path = self.paths.diagram_path(subject);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        let stored = load_from_path(&path).await?;
        if !stored.belongs_to(subject) {
            return Err(StorageError::CorruptEntry(path));
        }
        Ok(Some(stored))
    }

    /// Insert or replace the cached diagram for a subject.
    ///
    /// The previous entry, if any, is overwritten (last write wins); its
    /// `created_at` is kept and `updated_at` is refreshed.
    pub async fn upsert(&self, subject: &Subject, upsert: DiagramUpsert) -> Result<StoredDiagram> {
        let _guard = self.write_lock.lock().await;

        let stored = match self.get(subject).await {
            Ok(Some(mut existing)) => {
                existing.apply(upsert);
                existing
            }
            Ok(None) => StoredDiagram::create(subject, upsert),
            Err(e) => {
                warn!(subject = %subject, error = %e, "Replacing unreadable diagram entry");
                StoredDiagram::create(subject, upsert)
            }
        };

        self.paths.ensure_dirs().await?;
        let path = self.paths.diagram_path(subject);
        write_atomically(&path, &serde_json::to_vec_pretty(&stored)?).await?;

        debug!(subject = %subject, "Diagram cached");
        Ok(stored)
    }

    /// When the subject's diagram was last written.
    pub async fn last_generated(&self, subject: &Subject) -> Result<Option<DateTime<Utc>>> {
        Ok(self.get(subject).await?.map(|stored| stored.updated_at))
    }

    /// Remove the cached diagram for a subject. Returns whether it existed.
    pub async fn delete(&self, subject: &Subject) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let path = self.paths.diagram_path(subject);
        if !fs::try_exists(&path).await? {
            return Ok(false);
        }
        fs::remove_file(&path).await?;
        debug!(subject = %subject, "Diagram removed");
        Ok(true)
    }

    /// List all cached diagrams, most recently updated first.
    pub async fn list(&self) -> Result<Vec<StoredDiagram>> {
        let mut diagrams = Vec::new();

        if !fs::try_exists(&self.paths.diagrams_dir).await? {
            return Ok(diagrams);
        }

        let mut entries = fs::read_dir(&self.paths.diagrams_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match load_from_path(&path).await {
                    Ok(stored) => diagrams.push(stored),
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to load diagram"),
                }
            }
        }

        diagrams.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(diagrams)
    }

    /// Count cached diagrams, split by whether the user's own key was used.
    pub async fn stats(&self) -> Result<DiagramStats> {
        let diagrams = self.list().await?;
        let own_key_users = diagrams.iter().filter(|d| d.used_own_key).count();
        Ok(DiagramStats {
            total_diagrams: diagrams.len(),
            own_key_users,
            free_users: diagrams.len() - own_key_users,
        })
    }
}

async fn load_from_path(path: &Path) -> Result<StoredDiagram> {
    let content = fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}

/// Write to a sibling temp file, fsync, then rename over the target.
/// The temp file is removed if any step fails.
async fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");

    if let Err(e) = write_and_rename(&tmp_path, path, content).await {
        if let Err(cleanup) = fs::remove_file(&tmp_path).await
            && cleanup.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %tmp_path.display(), error = %cleanup, "Failed to remove temp file");
        }
        return Err(e.into());
    }

    // Sync parent directory on Unix so the rename survives a crash
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir) = fs::File::open(parent).await {
                let _ = dir.sync_all().await;
            }
        }
    }

    Ok(())
}

async fn write_and_rename(tmp_path: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)
        .await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(tmp_path, path).await
}
