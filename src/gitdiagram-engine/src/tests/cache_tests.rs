use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use gitdiagram_protocol::{Artifact, CachedResult, Frame};
use gitdiagram_storage::{DiagramStorage, GitDiagramPaths};

use super::fakes::{FakeCache, subject};
use crate::cache::{MISSING_EXPLANATION, MISSING_MAPPING, ResultCacheBridge};
use crate::machine::PhaseMachine;
use crate::state::GenerationState;
use crate::transport::LastGeneratedLookup;

#[tokio::test]
async fn test_lookup_failure_is_a_miss() {
    let bridge = ResultCacheBridge::new(FakeCache::failing());
    assert_eq!(bridge.lookup(&subject("alice/repo1")).await, None);
}

#[tokio::test]
async fn test_entry_without_diagram_is_a_miss() {
    let alice = subject("alice/repo1");
    let cache = FakeCache::with_entry(&alice, CachedResult::new("  ", "e", "m", false));
    let bridge = ResultCacheBridge::new(cache);
    assert_eq!(bridge.lookup(&alice).await, None);
}

#[tokio::test]
async fn test_store_failure_is_swallowed() {
    let cache = FakeCache::failing();
    let bridge = ResultCacheBridge::new(cache.clone());
    assert!(!bridge.store(&subject("alice/repo1"), "graph", "e", "m", true).await);
    assert_eq!(cache.stores(), 1);
}

#[tokio::test]
async fn test_store_applies_placeholders() {
    let alice = subject("alice/repo1");
    let cache = FakeCache::new();
    let bridge = ResultCacheBridge::new(cache.clone());

    assert!(bridge.store(&alice, "graph", "", " ", false).await);
    assert_eq!(
        cache.get(&alice),
        Some(CachedResult::new("graph", MISSING_EXPLANATION, MISSING_MAPPING, false))
    );
}

#[tokio::test]
async fn test_store_completed_requires_final_diagram() {
    let alice = subject("alice/repo1");
    let cache = FakeCache::new();
    let bridge = ResultCacheBridge::new(cache.clone());

    let mut machine = PhaseMachine::new();
    machine.apply(Frame::Chunk {
        artifact: Artifact::Diagram,
        chunk: "graph".to_string(),
    });
    assert!(!bridge.store_completed(&alice, machine.state(), false).await);
    assert!(
        !bridge
            .store_completed(&alice, &GenerationState::failed("boom"), false)
            .await
    );
    assert_eq!(cache.stores(), 0);

    machine.apply(Frame::Complete {
        diagram: None,
        explanation: Some("final".to_string()),
        mapping: None,
    });
    assert!(bridge.store_completed(&alice, machine.state(), true).await);
    assert_eq!(
        cache.get(&alice),
        Some(CachedResult::new("graph", "final", MISSING_MAPPING, true))
    );
}

#[tokio::test]
async fn test_bridge_over_file_storage() {
    let dir = tempdir().unwrap();
    let storage = Arc::new(DiagramStorage::with_paths(GitDiagramPaths::from_root(
        dir.path().to_path_buf(),
    )));
    storage.init().await.unwrap();
    let bridge = ResultCacheBridge::new(storage.clone());
    let alice = subject("Alice/Repo1");

    assert_eq!(bridge.lookup(&alice).await, None);
    assert_eq!(
        LastGeneratedLookup::last_generated(storage.as_ref(), &alice)
            .await
            .unwrap(),
        None
    );

    assert!(bridge.store(&alice, "graph TD", "explained", "mapped", true).await);
    assert!(bridge.store(&alice, "graph LR", "explained", "mapped", false).await);

    let cached = bridge.lookup(&subject("alice/repo1")).await.unwrap();
    assert_eq!(cached, CachedResult::new("graph LR", "explained", "mapped", false));
    assert!(
        LastGeneratedLookup::last_generated(storage.as_ref(), &alice)
            .await
            .unwrap()
            .is_some()
    );
    assert_eq!(storage.stats().await.unwrap().total_diagrams, 1);
}
