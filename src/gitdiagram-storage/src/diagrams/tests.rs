//! Tests for the diagram cache.

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use gitdiagram_protocol::{CachedResult, Subject};

use crate::diagrams::{DiagramStats, DiagramStorage, DiagramUpsert};
use crate::error::StorageError;
use crate::paths::GitDiagramPaths;

fn subject(s: &str) -> Subject {
    s.parse().unwrap()
}

async fn storage_in(dir: &std::path::Path) -> DiagramStorage {
    let storage = DiagramStorage::with_paths(GitDiagramPaths::from_root(dir.to_path_buf()));
    storage.init().await.unwrap();
    storage
}

#[tokio::test]
async fn test_missing_entry_is_none() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path()).await;

    assert!(storage.get(&subject("alice/repo1")).await.unwrap().is_none());
    assert!(
        storage
            .last_generated(&subject("alice/repo1"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_upsert_then_get() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path()).await;
    let alice = subject("alice/repo1");

    storage
        .upsert(
            &alice,
            DiagramUpsert::new("flowchart TD\nA-->B", "explains", "maps").used_own_key(true),
        )
        .await
        .unwrap();

    let stored = storage.get(&alice).await.unwrap().unwrap();
    assert_eq!(stored.username, "alice");
    assert_eq!(stored.repo, "repo1");
    assert_eq!(stored.diagram, "flowchart TD\nA-->B");
    assert!(stored.used_own_key);

    let cached: CachedResult = stored.into();
    assert_eq!(
        cached,
        CachedResult::new("flowchart TD\nA-->B", "explains", "maps", true)
    );
}

#[tokio::test]
async fn test_upsert_is_last_write_wins() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path()).await;
    let alice = subject("alice/repo1");

    let first = storage
        .upsert(&alice, DiagramUpsert::new("v1", "e1", "m1"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let second = storage
        .upsert(&alice, DiagramUpsert::new("v2", "e2", "m2").used_own_key(true))
        .await
        .unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);

    let stored = storage.get(&alice).await.unwrap().unwrap();
    assert_eq!(stored.diagram, "v2");
    assert_eq!(stored.explanation, "e2");
    assert!(stored.used_own_key);
    assert_eq!(
        storage.last_generated(&alice).await.unwrap(),
        Some(second.updated_at)
    );
    assert_eq!(storage.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_subjects_are_case_insensitive_keys() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path()).await;

    storage
        .upsert(&subject("Alice/Repo1"), DiagramUpsert::new("d", "e", "m"))
        .await
        .unwrap();
    assert!(storage.get(&subject("alice/repo1")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_stats_and_list_order() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path()).await;

    storage
        .upsert(&subject("a/one"), DiagramUpsert::new("d", "e", "m"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    storage
        .upsert(
            &subject("b/two"),
            DiagramUpsert::new("d", "e", "m").used_own_key(true),
        )
        .await
        .unwrap();

    let list = storage.list().await.unwrap();
    assert_eq!(list[0].repo, "two");
    assert_eq!(list[1].repo, "one");

    assert_eq!(
        storage.stats().await.unwrap(),
        DiagramStats {
            total_diagrams: 2,
            own_key_users: 1,
            free_users: 1,
        }
    );
}

#[tokio::test]
async fn test_delete() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path()).await;
    let alice = subject("alice/repo1");

    storage
        .upsert(&alice, DiagramUpsert::new("d", "e", "m"))
        .await
        .unwrap();
    assert!(storage.delete(&alice).await.unwrap());
    assert!(!storage.delete(&alice).await.unwrap());
    assert!(storage.get(&alice).await.unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_entry_is_an_error_and_is_replaced_on_write() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path()).await;
    let alice = subject("alice/repo1");

    let path = storage.paths().diagram_path(&alice);
    tokio::fs::write(&path, b"{ not json").await.unwrap();
    assert!(matches!(
        storage.get(&alice).await,
        Err(StorageError::Json(_))
    ));

    storage
        .upsert(&alice, DiagramUpsert::new("fresh", "e", "m"))
        .await
        .unwrap();
    assert_eq!(storage.get(&alice).await.unwrap().unwrap().diagram, "fresh");
}

#[tokio::test]
async fn test_failed_write_leaves_no_temp_file() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path()).await;
    let alice = subject("alice/repo1");

    // A non-empty directory at the entry path makes the final rename fail.
    let path = storage.paths().diagram_path(&alice);
    tokio::fs::create_dir_all(path.join("blocker")).await.unwrap();

    let result = storage
        .upsert(&alice, DiagramUpsert::new("graph", "e", "m"))
        .await;

    assert!(matches!(result, Err(StorageError::Io(_))));
    assert!(!path.with_extension("json.tmp").exists());
    assert!(path.is_dir());
}
