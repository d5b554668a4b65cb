//! Content addressing and description of individual asset files.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use updraft_core::hash::{AssetKey, ContentHash};
use updraft_core::{AssetDescriptor, AssetRequest, Platform};
use updraft_storage::{BundleStore, ResolvedBundle, StorageError};

/// Content type reported for every launch asset.
pub const LAUNCH_ASSET_CONTENT_TYPE: &str = "application/javascript";

/// Characters escaped in query values: everything except RFC 3986 unreserved.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Where asset URLs point and which bundle they address.
#[derive(Clone, Copy, Debug)]
pub struct AssetLocation<'a> {
    /// Public base URL of the asset host.
    pub hostname: &'a str,
    pub runtime_version: &'a str,
    pub platform: Platform,
}

impl AssetLocation<'_> {
    /// Build the fetch URL for an asset at `key` (relative to the updates root).
    pub fn url_for(&self, key: &str) -> String {
        format!(
            "{}/api/assets?asset={}&runtimeVersion={}&platform={}",
            self.hostname.trim_end_matches('/'),
            utf8_percent_encode(key, QUERY_VALUE),
            utf8_percent_encode(self.runtime_version, QUERY_VALUE),
            self.platform.as_str(),
        )
    }
}

/// Content type for an asset. Unknown extensions yield `None`.
pub fn content_type_for(request: &AssetRequest) -> Option<String> {
    match request {
        AssetRequest::Launch { .. } => Some(LAUNCH_ASSET_CONTENT_TYPE.to_string()),
        AssetRequest::Regular { ext, .. } => mime_guess::from_ext(ext.trim_start_matches('.'))
            .first_raw()
            .map(str::to_string),
    }
}

/// Describe an asset from its bytes.
pub fn describe(data: &[u8], request: &AssetRequest, url: String) -> AssetDescriptor {
    AssetDescriptor {
        hash: ContentHash::compute(data).to_base64url(),
        key: AssetKey::compute(data),
        file_extension: request.file_extension(),
        content_type: content_type_for(request),
        url,
    }
}

/// Read one asset of `bundle` and describe it.
///
/// Asset paths come from the published metadata, so an unsafe path is a
/// broken bundle and reported as a server error.
pub async fn describe_asset(
    store: &BundleStore,
    bundle: &ResolvedBundle,
    request: &AssetRequest,
    location: AssetLocation<'_>,
) -> ApiResult<AssetDescriptor> {
    let data = store
        .read_asset(bundle, request.path())
        .await
        .map_err(|e| match e {
            StorageError::InvalidKey(msg) => ApiError::Internal(format!(
                "bundle {} lists an unsafe asset path: {msg}",
                bundle.directory()
            )),
            other => other.into(),
        })?;
    metrics::ASSETS_HASHED.inc();

    let url = location.url_for(&bundle.file_key(request.path()));
    Ok(describe(&data, request, url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> AssetLocation<'static> {
        AssetLocation {
            hostname: "https://updates.example.com/",
            runtime_version: "1.0.0",
            platform: Platform::Ios,
        }
    }

    fn regular(path: &str, ext: &str) -> AssetRequest {
        AssetRequest::Regular {
            path: path.to_string(),
            ext: ext.to_string(),
        }
    }

    #[test]
    fn test_url_encodes_query_values() {
        let url = location().url_for("1.0.0/17/assets/a b.png");
        assert_eq!(
            url,
            "https://updates.example.com/api/assets?asset=1.0.0%2F17%2Fassets%2Fa%20b.png\
             &runtimeVersion=1.0.0&platform=ios"
        );
    }

    #[test]
    fn test_identical_bytes_identical_address() {
        let loc = location();
        let first = describe(b"same", &regular("assets/a", "png"), loc.url_for("1/1/assets/a"));
        let second = describe(b"same", &regular("assets/b", "png"), loc.url_for("1/2/assets/b"));

        assert_eq!(first.hash, second.hash);
        assert_eq!(first.key, second.key);
        assert_ne!(first.url, second.url);
    }

    #[test]
    fn test_hash_and_key_encoding() {
        let desc = describe(b"hello", &regular("assets/x", "txt"), String::new());
        assert_eq!(desc.hash, "LPJNul-wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ");
        assert_eq!(desc.key.as_str(), "5d41402abc4b2a76b9719d911017c592");
    }

    #[tokio::test]
    async fn test_asset_paths_from_metadata() {
        use std::sync::Arc;
        use updraft_storage::MemoryBackend;

        let backend = Arc::new(MemoryBackend::new());
        backend.insert("1.0.0/17/metadata.json", "{}").unwrap();
        backend.insert("1.0.0/17/assets/logo..v2.png", "v2").unwrap();
        let store = BundleStore::new(backend);
        let bundle = store.resolve_latest("1.0.0").await.unwrap();

        let desc = describe_asset(&store, &bundle, &regular("assets/logo..v2.png", "png"), location())
            .await
            .unwrap();
        assert!(desc.url.contains("assets%2Flogo..v2.png"));

        let err = describe_asset(&store, &bundle, &regular("../16/secret", "png"), location())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status_code().as_u16(), 500);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(
            content_type_for(&regular("a", "png")).as_deref(),
            Some("image/png")
        );
        assert_eq!(
            content_type_for(&regular("a", "jpg")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(content_type_for(&regular("a", "zzunknown")), None);

        let launch = AssetRequest::Launch {
            path: "bundles/ios.hbc".to_string(),
        };
        assert_eq!(
            content_type_for(&launch).as_deref(),
            Some(LAUNCH_ASSET_CONTENT_TYPE)
        );
        assert_eq!(describe(b"js", &launch, String::new()).file_extension, ".bundle");
    }
}
