//! Resolution and reads of published bundles.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BundleSource, validate_key, validate_segment};
use bytes::Bytes;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;
use updraft_core::bundle::{
    BundleKind, DEFAULT_CONFIG_FILE, METADATA_FILE, ROLLBACK_MARKER, classify_entries,
    parse_publish_timestamp, select_latest_bundle,
};

/// The newest bundle published for a runtime version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBundle {
    runtime_version: String,
    directory: String,
    publish_timestamp: u64,
}

impl ResolvedBundle {
    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    /// Bundle directory key, `<runtimeVersion>/<publishTimestamp>`.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn publish_timestamp(&self) -> u64 {
        self.publish_timestamp
    }

    /// Key of a file inside the bundle.
    pub fn file_key(&self, relative: &str) -> String {
        format!("{}/{}", self.directory, relative)
    }
}

/// The raw `metadata.json` document of a bundle.
#[derive(Clone, Debug)]
pub struct MetadataDocument {
    /// Exact bytes on disk. The manifest id is derived from these.
    pub raw: Bytes,
    /// When the document was created.
    pub created_at: OffsetDateTime,
}

/// Bundle-level access on top of a [`BundleSource`].
#[derive(Clone)]
pub struct BundleStore {
    source: Arc<dyn BundleSource>,
    config_file: String,
}

impl BundleStore {
    pub fn new(source: Arc<dyn BundleSource>) -> Self {
        Self::with_config_file(source, DEFAULT_CONFIG_FILE)
    }

    /// Use a non-default name for the app config document.
    pub fn with_config_file(source: Arc<dyn BundleSource>, config_file: impl Into<String>) -> Self {
        Self {
            source,
            config_file: config_file.into(),
        }
    }

    pub fn source(&self) -> &Arc<dyn BundleSource> {
        &self.source
    }

    /// Find the newest bundle directory for `runtime_version`.
    ///
    /// Fails with [`StorageError::NotFound`] when the runtime version
    /// directory is missing or unreadable, holds no bundle directories, or
    /// when the newest bundle lacks its metadata document. A runtime version
    /// that is not a single path segment fails with [`StorageError::InvalidKey`].
    #[instrument(skip(self))]
    pub async fn resolve_latest(&self, runtime_version: &str) -> StorageResult<ResolvedBundle> {
        validate_segment(runtime_version)?;

        let entries = match self.source.list(runtime_version).await {
            Ok(entries) => entries,
            Err(StorageError::InvalidKey(msg)) => return Err(StorageError::InvalidKey(msg)),
            Err(e) => {
                tracing::debug!(error = %e, "runtime version directory unavailable");
                return Err(StorageError::NotFound(format!(
                    "unsupported runtime version or directory access denied: {runtime_version}"
                )));
            }
        };

        let dirs: Vec<&str> = entries
            .iter()
            .filter(|e| e.is_dir)
            .map(|e| e.name.as_str())
            .collect();
        if dirs.is_empty() {
            return Err(StorageError::NotFound(format!(
                "no updates found for runtime version {runtime_version}"
            )));
        }

        let latest = select_latest_bundle(dirs.iter().copied()).ok_or_else(|| {
            StorageError::NotFound(format!(
                "no valid update directories found for runtime version {runtime_version}"
            ))
        })?;
        let publish_timestamp = parse_publish_timestamp(latest).ok_or_else(|| {
            StorageError::NotFound(format!("invalid update directory {latest}"))
        })?;

        let bundle = ResolvedBundle {
            runtime_version: runtime_version.to_string(),
            directory: format!("{runtime_version}/{latest}"),
            publish_timestamp,
        };

        if !self.source.exists(&bundle.file_key(METADATA_FILE)).await? {
            return Err(StorageError::NotFound(format!(
                "latest update directory {} is invalid or incomplete",
                bundle.directory
            )));
        }

        tracing::debug!(bundle = %bundle.directory, "resolved latest bundle");
        Ok(bundle)
    }

    /// Determine whether a bundle is served as a manifest or a rollback.
    #[instrument(skip(self, bundle), fields(bundle = %bundle.directory))]
    pub async fn classify(&self, bundle: &ResolvedBundle) -> StorageResult<BundleKind> {
        let entries = self.source.list(&bundle.directory).await?;
        Ok(classify_entries(entries.iter().map(|e| e.name.as_str())))
    }

    /// Read the bundle's metadata document.
    pub async fn read_metadata(&self, bundle: &ResolvedBundle) -> StorageResult<MetadataDocument> {
        let key = bundle.file_key(METADATA_FILE);
        let raw = self.source.read(&key).await?;
        let created_at = self.source.created_at(&key).await?;
        Ok(MetadataDocument { raw, created_at })
    }

    /// Read the bundle's app config document.
    pub async fn read_app_config(&self, bundle: &ResolvedBundle) -> StorageResult<Bytes> {
        self.source.read(&bundle.file_key(&self.config_file)).await
    }

    /// Read an asset by its path relative to the bundle directory.
    pub async fn read_asset(&self, bundle: &ResolvedBundle, path: &str) -> StorageResult<Bytes> {
        validate_key(path)?;
        self.source.read(&bundle.file_key(path)).await
    }

    /// When the rollback marker was created.
    pub async fn rollback_committed_at(
        &self,
        bundle: &ResolvedBundle,
    ) -> StorageResult<OffsetDateTime> {
        self.source
            .created_at(&bundle.file_key(ROLLBACK_MARKER))
            .await
    }
}
