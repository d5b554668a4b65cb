//! Core domain types and shared logic for the updraft update server.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Platforms and protocol versions
//! - Manifests, asset descriptors and directives
//! - The published `metadata.json` document
//! - Content hashes and manifest identifiers
//! - Bundle selection and classification rules
//! - Configuration

pub mod bundle;
pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod protocol;

pub use bundle::{BundleKind, classify_entries, select_latest_bundle};
pub use error::{Error, Result};
pub use hash::{AssetKey, ContentHash, ManifestId};
pub use manifest::{
    AssetDescriptor, AssetEntry, AssetRequest, BundleMetadata, Directive, Manifest, ManifestExtra,
    PlatformMetadata,
};
pub use protocol::{Platform, ProtocolVersion};
