//! Storage trait definitions.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path};
use time::OffsetDateTime;

/// One immediate child of a listed directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name (a single path segment).
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Read-only view of a published bundle tree.
///
/// Keys are `/`-separated paths relative to the tree root. The empty key
/// names the root itself and is only meaningful for [`BundleSource::list`].
#[async_trait]
pub trait BundleSource: Send + Sync {
    /// List the immediate children of a directory.
    async fn list(&self, dir: &str) -> StorageResult<Vec<DirEntry>>;

    /// Read a whole file into memory.
    async fn read(&self, key: &str) -> StorageResult<Bytes>;

    /// Check whether a file or directory exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// When a file was created. Backends without birth times report the
    /// modification time instead.
    async fn created_at(&self, key: &str) -> StorageResult<OffsetDateTime>;

    /// Verify the tree is reachable.
    async fn health_check(&self) -> StorageResult<()>;
}

/// Reject keys that could address anything outside the tree root.
///
/// Only whole `..` components are traversal; dots inside a file name are fine.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.starts_with('/') || key.starts_with('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(format!(
            "path traversal not allowed: {key}"
        )));
    }

    for component in Path::new(key).components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(StorageError::InvalidKey(format!(
                    "contains unsafe path component: {key}"
                )));
            }
        }
    }

    Ok(())
}

/// Validate a value that must be exactly one path segment, such as a runtime version.
pub fn validate_segment(segment: &str) -> StorageResult<()> {
    if segment.is_empty() || segment.contains('/') || segment.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "expected a single path segment: {segment:?}"
        )));
    }
    validate_key(segment)
}
