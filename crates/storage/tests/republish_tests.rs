// Consistency tests for bundles published while the tree is being read.
// Resolution must see either the old or the new bundle, never a failure.

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::Duration;
use updraft_core::BundleKind;
use updraft_storage::{BundleStore, FilesystemBackend};

/// Publish a bundle by staging it outside the tree and renaming it into place.
fn publish(root: &Path, directory: &str, rollback: bool) {
    let staging = root.join(".staging").join(directory.replace('/', "-"));
    std::fs::create_dir_all(&staging).unwrap();
    std::fs::write(staging.join("metadata.json"), b"{}").unwrap();
    if rollback {
        std::fs::write(staging.join("rollback"), b"").unwrap();
    }

    let target = root.join(directory);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::rename(&staging, &target).unwrap();
}

fn store(temp_dir: &TempDir) -> BundleStore {
    BundleStore::new(Arc::new(FilesystemBackend::new(temp_dir.path())))
}

#[tokio::test]
async fn test_resolve_during_republish() {
    let temp_dir = TempDir::new().unwrap();
    publish(temp_dir.path(), "7/100", false);
    let store = store(&temp_dir);

    let root = temp_dir.path().to_path_buf();
    let publisher = tokio::task::spawn_blocking(move || {
        for ts in 101..150 {
            publish(&root, &format!("7/{ts}"), false);
        }
    });

    let mut seen = Vec::new();
    for _ in 0..50 {
        let bundle = store.resolve_latest("7").await.unwrap();
        seen.push(bundle.publish_timestamp());
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    publisher.await.unwrap();

    // Timestamps only move forward
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(
        store.resolve_latest("7").await.unwrap().directory(),
        "7/149"
    );
}

#[tokio::test]
async fn test_unfinished_bundle_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    publish(temp_dir.path(), "7/100", false);
    std::fs::create_dir_all(temp_dir.path().join("7/200")).unwrap();
    let store = store(&temp_dir);

    // The newest directory wins even without its metadata, and is reported missing
    let err = store.resolve_latest("7").await.unwrap_err();
    assert!(matches!(err, updraft_storage::StorageError::NotFound(_)));

    std::fs::write(temp_dir.path().join("7/200/metadata.json"), b"{}").unwrap();
    assert_eq!(
        store.resolve_latest("7").await.unwrap().directory(),
        "7/200"
    );
}

#[tokio::test]
async fn test_rollback_published_over_normal() {
    let temp_dir = TempDir::new().unwrap();
    publish(temp_dir.path(), "7/100", false);
    let store = store(&temp_dir);

    let bundle = store.resolve_latest("7").await.unwrap();
    assert_eq!(store.classify(&bundle).await.unwrap(), BundleKind::Normal);

    publish(temp_dir.path(), "7/101", true);
    let bundle = store.resolve_latest("7").await.unwrap();
    assert_eq!(store.classify(&bundle).await.unwrap(), BundleKind::Rollback);
    assert!(store.rollback_committed_at(&bundle).await.is_ok());
}

#[tokio::test]
async fn test_runtime_versions_are_isolated() {
    let temp_dir = TempDir::new().unwrap();
    publish(temp_dir.path(), "1/500", false);
    publish(temp_dir.path(), "2/100", false);
    let store = store(&temp_dir);

    assert_eq!(store.resolve_latest("1").await.unwrap().directory(), "1/500");
    assert_eq!(store.resolve_latest("2").await.unwrap().directory(), "2/100");
    assert!(store.resolve_latest("3").await.is_err());
}
