//! Manifest assembly for normal (non-rollback) bundles.

use crate::error::{ApiError, ApiResult};
use crate::protocol::assets::{AssetLocation, describe_asset};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use updraft_core::{BundleMetadata, Manifest, ManifestExtra, ManifestId, ProtocolVersion};
use updraft_storage::{BundleStore, ResolvedBundle};

/// Outcome of building a manifest.
#[derive(Debug)]
pub enum ManifestResult {
    /// A manifest to serve.
    Manifest(Box<Manifest>),
    /// The client already runs this bundle.
    NoUpdate,
}

/// Per-request inputs to manifest construction.
#[derive(Clone, Copy, Debug)]
pub struct ManifestRequest<'a> {
    pub location: AssetLocation<'a>,
    /// Update id the client reports it is running.
    pub current_update_id: Option<&'a str>,
    pub protocol: ProtocolVersion,
}

/// Build the manifest for `bundle`, or report that the client is current.
pub async fn build_manifest(
    store: &BundleStore,
    bundle: &ResolvedBundle,
    request: ManifestRequest<'_>,
) -> ApiResult<ManifestResult> {
    let document = store.read_metadata(bundle).await?;
    let metadata = BundleMetadata::parse(&document.raw)?;
    let platform_metadata = metadata.for_platform(request.location.platform)?;

    let id = ManifestId::from_metadata(&document.raw);
    if request.protocol.supports_no_update_short_circuit()
        && request.current_update_id.is_some_and(|current| id.matches(current))
    {
        tracing::debug!(manifest_id = %id, "client already runs the latest bundle");
        return Ok(ManifestResult::NoUpdate);
    }

    let config = store.read_app_config(bundle).await?;
    let expo_client: serde_json::Value = serde_json::from_slice(&config)
        .map_err(|e| ApiError::Internal(format!("invalid app config document: {e}")))?;
    if !expo_client.is_object() {
        return Err(ApiError::Internal(
            "invalid app config document: expected a JSON object".to_string(),
        ));
    }

    let asset_requests: Vec<_> = platform_metadata.asset_requests().collect();
    let assets = try_join_all(
        asset_requests
            .iter()
            .map(|asset| describe_asset(store, bundle, asset, request.location)),
    )
    .await?;
    let launch_asset = describe_asset(
        store,
        bundle,
        &platform_metadata.launch_request(),
        request.location,
    )
    .await?;

    Ok(ManifestResult::Manifest(Box::new(Manifest {
        id,
        created_at: document.created_at,
        runtime_version: request.location.runtime_version.to_string(),
        assets,
        launch_asset,
        metadata: serde_json::Map::new(),
        extra: ManifestExtra { expo_client },
    })))
}

/// The `extensions` part: extra request headers per asset key.
pub fn asset_request_headers(
    manifest: &Manifest,
    headers: &BTreeMap<String, String>,
) -> serde_json::Value {
    let header_values: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
        .collect();
    let per_asset: serde_json::Map<String, serde_json::Value> = manifest
        .all_assets()
        .map(|asset| {
            (
                asset.key.as_str().to_string(),
                serde_json::Value::Object(header_values.clone()),
            )
        })
        .collect();
    serde_json::json!({ "assetRequestHeaders": per_asset })
}
