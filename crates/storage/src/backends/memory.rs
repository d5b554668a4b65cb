//! In-memory bundle source, used by tests and embedders that assemble
//! bundles without touching disk.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BundleSource, DirEntry, validate_key};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use time::OffsetDateTime;

#[derive(Clone)]
struct MemoryFile {
    data: Bytes,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Tree {
    files: BTreeMap<String, MemoryFile>,
    // Directories created explicitly; parents of files are implied.
    dirs: BTreeSet<String>,
}

impl Tree {
    fn is_dir(&self, key: &str) -> bool {
        if key.is_empty() || self.dirs.contains(key) {
            return true;
        }
        let prefix = format!("{key}/");
        self.files.keys().any(|k| k.starts_with(&prefix))
            || self.dirs.iter().any(|d| d.starts_with(&prefix))
    }
}

/// A bundle tree held entirely in memory.
#[derive(Default)]
pub struct MemoryBackend {
    tree: RwLock<Tree>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, stamped with the current time.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>) -> StorageResult<()> {
        self.insert_at(key, data, OffsetDateTime::now_utc())
    }

    /// Add or replace a file with an explicit creation time.
    pub fn insert_at(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        created_at: OffsetDateTime,
    ) -> StorageResult<()> {
        validate_key(key)?;
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        let mut tree = self.write()?;
        tree.files.insert(
            key.to_string(),
            MemoryFile {
                data: data.into(),
                created_at,
            },
        );
        Ok(())
    }

    /// Create an empty directory.
    pub fn create_dir(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.write()?.dirs.insert(key.to_string());
        Ok(())
    }

    /// Remove a file. Returns whether it existed.
    pub fn remove(&self, key: &str) -> StorageResult<bool> {
        Ok(self.write()?.files.remove(key).is_some())
    }

    fn read_tree(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Tree>> {
        self.tree
            .read()
            .map_err(|_| StorageError::Io(std::io::Error::other("memory backend lock poisoned")))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Tree>> {
        self.tree
            .write()
            .map_err(|_| StorageError::Io(std::io::Error::other("memory backend lock poisoned")))
    }
}

#[async_trait]
impl BundleSource for MemoryBackend {
    async fn list(&self, dir: &str) -> StorageResult<Vec<DirEntry>> {
        validate_key(dir)?;
        let tree = self.read_tree()?;
        if !tree.is_dir(dir) {
            return Err(StorageError::NotFound(dir.to_string()));
        }

        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        let paths = tree
            .files
            .keys()
            .map(|k| (k.as_str(), false))
            .chain(tree.dirs.iter().map(|d| (d.as_str(), true)));
        for (path, explicit_dir) in paths {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            match rest.split_once('/') {
                Some((child, _)) => {
                    children.insert(child.to_string(), true);
                }
                None => {
                    children.entry(rest.to_string()).or_insert(explicit_dir);
                }
            }
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    async fn read(&self, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        self.read_tree()?
            .files
            .get(key)
            .map(|f| f.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let tree = self.read_tree()?;
        Ok(tree.files.contains_key(key) || tree.is_dir(key))
    }

    async fn created_at(&self, key: &str) -> StorageResult<OffsetDateTime> {
        validate_key(key)?;
        self.read_tree()?
            .files
            .get(key)
            .map(|f| f.created_at)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.read_tree().map(|_| ())
    }
}
