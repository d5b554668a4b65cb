//! Read-only access to the published bundle tree.
//!
//! This crate provides:
//! - The [`BundleSource`] listing/read abstraction
//! - Backends: local filesystem and in-memory
//! - [`BundleStore`]: latest-bundle resolution, classification and bundle file reads

pub mod backends;
pub mod bundle;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend};
pub use bundle::{BundleStore, MetadataDocument, ResolvedBundle};
pub use error::{StorageError, StorageResult};
pub use traits::{BundleSource, DirEntry};

use std::sync::Arc;
use updraft_core::config::UpdatesConfig;

/// Create a bundle store from configuration.
pub async fn from_config(config: &UpdatesConfig) -> StorageResult<BundleStore> {
    config.validate().map_err(StorageError::Config)?;

    let backend = FilesystemBackend::new(&config.root);
    backend.health_check().await?;
    Ok(BundleStore::with_config_file(
        Arc::new(backend),
        config.config_file.clone(),
    ))
}
