//! Local filesystem bundle source.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BundleSource, DirEntry, validate_key};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tracing::instrument;

/// Serves a bundle tree from a local directory.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a backend rooted at `root`. The directory is not created; a
    /// missing root surfaces through [`BundleSource::health_check`].
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Runs the canonicalization in `spawn_blocking` so it does not stall
    /// the runtime.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Resolve `key` under `root`, rejecting keys that escape the root either
    /// lexically or through a symlink.
    fn key_path_sync(root: &Path, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;

        let path = if key.is_empty() {
            root.to_path_buf()
        } else {
            root.join(key)
        };

        let meta = match std::fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            // Reads of a missing path report NotFound themselves.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(path),
            Err(err) => {
                return Err(StorageError::Io(std::io::Error::new(
                    err.kind(),
                    format!("failed to stat path: {err}"),
                )));
            }
        };

        let root_canonical = root.canonicalize().map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize root: {e}"),
            ))
        })?;

        let canonical = path.canonicalize().map_err(|e| {
            if meta.file_type().is_symlink() {
                StorageError::InvalidKey(format!("symlink target missing or invalid: {key}"))
            } else {
                StorageError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to canonicalize path: {e}"),
                ))
            }
        })?;

        if !canonical.starts_with(&root_canonical) {
            return Err(StorageError::InvalidKey(format!(
                "resolved path escapes storage root: {key}"
            )));
        }

        Ok(path)
    }
}

fn map_not_found(key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl BundleSource for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self, dir: &str) -> StorageResult<Vec<DirEntry>> {
        let path = self.key_path(dir).await?;
        let mut entries = fs::read_dir(&path)
            .await
            .map_err(|e| map_not_found(dir, e))?;

        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(path = %entry.path().display(), "skipping non-UTF-8 entry");
                continue;
            };
            // file_type() does not follow symlinks; linked entries are skipped.
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::warn!(entry = %name, error = %e, "failed to stat directory entry");
                    continue;
                }
            };
            if file_type.is_dir() {
                results.push(DirEntry::dir(name));
            } else if file_type.is_file() {
                results.push(DirEntry::file(name));
            }
        }

        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn read(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key).await?;
        let data = fs::read(&path).await.map_err(|e| map_not_found(key, e))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn created_at(&self, key: &str) -> StorageResult<OffsetDateTime> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| map_not_found(key, e))?;

        let time = match metadata.created() {
            Ok(created) => created,
            Err(_) => metadata.modified()?,
        };
        Ok(OffsetDateTime::from(time))
    }

    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            map_not_found(&self.root.display().to_string(), e)
        })?;
        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "updates root is not a directory: {}",
                self.root.display()
            )));
        }
        Ok(())
    }
}
