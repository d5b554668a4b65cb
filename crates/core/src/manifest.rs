//! Manifest, directive and bundle metadata documents.

use crate::error::{Error, Result};
use crate::hash::{AssetKey, ManifestId};
use crate::protocol::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Serde adapter for protocol timestamps: UTC, millisecond precision, `Z` suffix.
pub mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;

    /// Format a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub fn format(ts: OffsetDateTime) -> String {
        let utc = ts.to_offset(time::UtcOffset::UTC);
        let format =
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");
        // The fixed description only contains components every OffsetDateTime has.
        utc.format(&format).unwrap_or_else(|_| String::from("1970-01-01T00:00:00.000Z"))
    }

    pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
    }
}

/// Description of one asset file in a manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    /// Unpadded base64url SHA-256 of the file.
    pub hash: String,
    /// Hex MD5 of the file (content address).
    pub key: AssetKey,
    /// Extension including the leading dot.
    pub file_extension: String,
    /// MIME type; `null` when the extension is unknown.
    pub content_type: Option<String>,
    /// Where the client fetches the bytes from.
    pub url: String,
}

/// Fields under a manifest's `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestExtra {
    /// The bundle's exported app config.
    #[serde(rename = "expoClient")]
    pub expo_client: serde_json::Value,
}

/// A manifest describing the assets that make up one update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: ManifestId,
    #[serde(with = "timestamp")]
    pub created_at: OffsetDateTime,
    pub runtime_version: String,
    pub assets: Vec<AssetDescriptor>,
    pub launch_asset: AssetDescriptor,
    /// Reserved; always empty.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub extra: ManifestExtra,
}

impl Manifest {
    /// All assets including the launch asset, launch asset last.
    pub fn all_assets(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.assets.iter().chain(std::iter::once(&self.launch_asset))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Parameters of a rollback directive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollBackParameters {
    #[serde(with = "timestamp")]
    pub commit_time: OffsetDateTime,
}

/// An instruction to the client other than "apply this manifest".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Directive {
    /// Discard downloaded updates and run the bundle embedded in the app binary.
    RollBackToEmbedded { parameters: RollBackParameters },
    /// The client already runs the newest content.
    NoUpdateAvailable,
}

impl Directive {
    /// Build a rollback directive committed at `commit_time`.
    pub fn roll_back_to_embedded(commit_time: OffsetDateTime) -> Self {
        Self::RollBackToEmbedded {
            parameters: RollBackParameters { commit_time },
        }
    }

    /// Get the directive type as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RollBackToEmbedded { .. } => "rollBackToEmbedded",
            Self::NoUpdateAvailable => "noUpdateAvailable",
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// One auxiliary asset entry in `metadata.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Path relative to the bundle directory.
    pub path: String,
    /// Extension without the leading dot.
    pub ext: String,
}

/// Per-platform section of `metadata.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMetadata {
    /// Path of the launch asset relative to the bundle directory.
    pub bundle: String,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

impl PlatformMetadata {
    /// Requests for every auxiliary asset, in listing order.
    pub fn asset_requests(&self) -> impl Iterator<Item = AssetRequest> + '_ {
        self.assets.iter().map(|entry| AssetRequest::Regular {
            path: entry.path.clone(),
            ext: entry.ext.clone(),
        })
    }

    /// Request for the launch asset.
    pub fn launch_request(&self) -> AssetRequest {
        AssetRequest::Launch {
            path: self.bundle.clone(),
        }
    }
}

/// The `metadata.json` document published with every bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    pub file_metadata: BTreeMap<String, PlatformMetadata>,
}

impl BundleMetadata {
    /// Parse the raw document.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).map_err(|e| Error::InvalidMetadata(e.to_string()))
    }

    /// Get the section for a platform.
    pub fn for_platform(&self, platform: Platform) -> Result<&PlatformMetadata> {
        self.file_metadata
            .get(platform.as_str())
            .ok_or_else(|| Error::PlatformNotListed(platform.to_string()))
    }
}

/// What to describe: the launch asset or an auxiliary asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetRequest {
    /// The entry-point bundle. Always served as JavaScript.
    Launch { path: String },
    /// An auxiliary asset with its declared extension.
    Regular { path: String, ext: String },
}

impl AssetRequest {
    /// Path relative to the bundle directory.
    pub fn path(&self) -> &str {
        match self {
            Self::Launch { path } | Self::Regular { path, .. } => path,
        }
    }

    /// Extension reported in the manifest, including the leading dot.
    pub fn file_extension(&self) -> String {
        match self {
            Self::Launch { .. } => ".bundle".to_string(),
            Self::Regular { ext, .. } => format!(".{}", ext.trim_start_matches('.')),
        }
    }

    pub fn is_launch(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }
}
