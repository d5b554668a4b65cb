//! The manifest endpoint.
//!
//! Validates protocol inputs, resolves the newest bundle for the client's
//! runtime version, and answers with a manifest, a rollback directive or a
//! no-update directive. Every failure is mapped to a status code here.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::protocol::assets::AssetLocation;
use crate::protocol::directive;
use crate::protocol::manifest::{ManifestRequest, ManifestResult, asset_request_headers, build_manifest};
use crate::protocol::response::{MultipartBody, protocol_response};
use crate::state::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use std::time::Instant;
use updraft_core::bundle::BundleKind;
use updraft_core::{Directive, Manifest, Platform, ProtocolVersion};
use updraft_signer::SignerError;
use updraft_storage::ResolvedBundle;

pub const PROTOCOL_VERSION_HEADER: &str = "expo-protocol-version";
pub const PLATFORM_HEADER: &str = "expo-platform";
pub const RUNTIME_VERSION_HEADER: &str = "expo-runtime-version";
pub const CURRENT_UPDATE_ID_HEADER: &str = "expo-current-update-id";
pub const EMBEDDED_UPDATE_ID_HEADER: &str = "expo-embedded-update-id";
pub const EXPECT_SIGNATURE_HEADER: &str = "expo-expect-signature";

const SIGNING_UNAVAILABLE: &str = "Code signing requested but no key supplied when starting server.";

/// Query-string fallbacks for clients that cannot set headers.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ManifestQuery {
    pub platform: Option<String>,
    pub runtime_version: Option<String>,
}

impl ManifestQuery {
    /// Collect the fallbacks from decoded query pairs. A repeated key keeps
    /// its first value; unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "platform" => &mut query.platform,
                "runtime-version" => &mut query.runtime_version,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

/// Validated inputs of one manifest request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolRequest {
    pub protocol: ProtocolVersion,
    pub platform: Platform,
    pub runtime_version: String,
    pub current_update_id: Option<String>,
    pub embedded_update_id: Option<String>,
    pub expect_signature: bool,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl ProtocolRequest {
    /// Validate a request. Checks run in a fixed order and the first failure wins.
    ///
    /// The query string is only inspected once the method has been accepted.
    pub fn parse(
        method: &Method,
        headers: &HeaderMap,
        query: ApiResult<ManifestQuery>,
    ) -> ApiResult<Self> {
        if method != Method::GET {
            return Err(ApiError::MethodNotAllowed("Expected GET.".to_string()));
        }
        let query = query?;

        let protocol = {
            let mut values = headers.get_all(PROTOCOL_VERSION_HEADER).iter();
            match (values.next(), values.next()) {
                (None, _) => ProtocolVersion::V0,
                (Some(value), None) => value
                    .to_str()
                    .ok()
                    .and_then(|v| ProtocolVersion::parse(v).ok())
                    .ok_or_else(unsupported_protocol)?,
                (Some(_), Some(_)) => return Err(unsupported_protocol()),
            }
        };

        let platform = header_str(headers, PLATFORM_HEADER)
            .or(query.platform.as_deref())
            .and_then(|p| Platform::parse(p).ok())
            .ok_or_else(|| {
                ApiError::BadRequest(
                    "Unsupported platform. Expected either ios or android.".to_string(),
                )
            })?;

        let runtime_version = header_str(headers, RUNTIME_VERSION_HEADER)
            .or(query.runtime_version.as_deref())
            .filter(|rv| !rv.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No runtimeVersion provided.".to_string()))?
            .to_string();

        Ok(Self {
            protocol,
            platform,
            runtime_version,
            current_update_id: header_str(headers, CURRENT_UPDATE_ID_HEADER).map(str::to_string),
            embedded_update_id: header_str(headers, EMBEDDED_UPDATE_ID_HEADER)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            expect_signature: headers.contains_key(EXPECT_SIGNATURE_HEADER),
        })
    }
}

fn unsupported_protocol() -> ApiError {
    ApiError::BadRequest("Unsupported protocol version. Expected either 0 or 1.".to_string())
}

/// What a successful request was answered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Manifest,
    Rollback,
    NoUpdate,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::Rollback => "rollback",
            Self::NoUpdate => "no_update",
        }
    }
}

/// GET /api/manifest
///
/// Routed for every method so that non-GET requests get a protocol error
/// body instead of the router's default.
pub async fn get_manifest(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let start_time = Instant::now();
    let query = query
        .map(|Query(pairs)| ManifestQuery::from_pairs(pairs))
        .map_err(|e| ApiError::BadRequest(format!("Invalid query string: {}", e.body_text())));
    let result = match ProtocolRequest::parse(&method, &headers, query) {
        Ok(request) => dispatch(&state, &request).await,
        Err(e) => Err(e),
    };
    metrics::MANIFEST_BUILD_DURATION.observe(start_time.elapsed().as_secs_f64());

    match result {
        Ok((outcome, response)) => {
            metrics::record_outcome(outcome.as_str());
            response
        }
        Err(e) => {
            metrics::record_outcome("error");
            if e.status_code().is_server_error() {
                tracing::error!(error = %e, "manifest request failed");
            } else {
                tracing::info!(status = %e.status_code(), error = %e, "manifest request rejected");
            }
            e.to_response(state.include_error_detail())
        }
    }
}

async fn dispatch(state: &AppState, request: &ProtocolRequest) -> ApiResult<(Outcome, Response)> {
    let bundle = state.store.resolve_latest(&request.runtime_version).await?;
    let kind = state.store.classify(&bundle).await?;
    tracing::info!(
        bundle = %bundle.directory(),
        kind = kind.as_str(),
        platform = %request.platform,
        protocol = %request.protocol,
        "serving bundle"
    );

    match kind {
        BundleKind::Normal => {
            let manifest_request = ManifestRequest {
                location: AssetLocation {
                    hostname: &state.config.server.hostname,
                    runtime_version: &request.runtime_version,
                    platform: request.platform,
                },
                current_update_id: request.current_update_id.as_deref(),
                protocol: request.protocol,
            };
            match build_manifest(&state.store, &bundle, manifest_request).await? {
                ManifestResult::Manifest(manifest) => {
                    let response = serve_manifest(state, request, &manifest)?;
                    Ok((Outcome::Manifest, response))
                }
                ManifestResult::NoUpdate => serve_no_update(state, request),
            }
        }
        BundleKind::Rollback => serve_rollback(state, request, &bundle).await,
    }
}

async fn serve_rollback(
    state: &AppState,
    request: &ProtocolRequest,
    bundle: &ResolvedBundle,
) -> ApiResult<(Outcome, Response)> {
    directive::require_directives(request.protocol, "Rollbacks")?;

    let embedded = request.embedded_update_id.as_deref().ok_or_else(|| {
        ApiError::BadRequest("Invalid Expo-Embedded-Update-ID request header specified.".to_string())
    })?;
    if request.current_update_id.as_deref() == Some(embedded) {
        return serve_no_update(state, request);
    }

    let rollback = directive::roll_back_to_embedded(&state.store, bundle, request.protocol).await?;
    let response = serve_directive(state, request, &rollback)?;
    Ok((Outcome::Rollback, response))
}

fn serve_no_update(state: &AppState, request: &ProtocolRequest) -> ApiResult<(Outcome, Response)> {
    let no_update = directive::no_update_available(request.protocol)?;
    let response = serve_directive(state, request, &no_update)?;
    Ok((Outcome::NoUpdate, response))
}

fn serve_manifest(
    state: &AppState,
    request: &ProtocolRequest,
    manifest: &Manifest,
) -> ApiResult<Response> {
    let manifest_json = manifest.to_json()?;
    let signature = sign_if_expected(state, request, &manifest_json)?;
    let extensions = asset_request_headers(manifest, &state.config.server.asset_request_headers);

    let body = MultipartBody::new()
        .part("manifest", manifest_json, signature)
        .part("extensions", extensions.to_string(), None);
    protocol_response(request.protocol, body)
}

fn serve_directive(
    state: &AppState,
    request: &ProtocolRequest,
    directive: &Directive,
) -> ApiResult<Response> {
    tracing::debug!(directive = directive.kind(), "serving directive");
    let directive_json = directive.to_json()?;
    let signature = sign_if_expected(state, request, &directive_json)?;

    let body = MultipartBody::new().part("directive", directive_json, signature);
    protocol_response(request.protocol, body)
}

/// Sign `body` when the client asked for a signature.
fn sign_if_expected(
    state: &AppState,
    request: &ProtocolRequest,
    body: &str,
) -> ApiResult<Option<String>> {
    if !request.expect_signature {
        return Ok(None);
    }

    let header = state
        .signing
        .signature_header(body.as_bytes())
        .map_err(|e| match e {
            SignerError::Unavailable => ApiError::BadRequest(SIGNING_UNAVAILABLE.to_string()),
            other => ApiError::from(other),
        })?;
    metrics::SIGNATURES_CREATED.inc();
    Ok(Some(header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn parse(pairs: &[(&'static str, &'static str)]) -> ApiResult<ProtocolRequest> {
        ProtocolRequest::parse(&Method::GET, &headers(pairs), Ok(ManifestQuery::default()))
    }

    #[test]
    fn test_parse_full_request() {
        let request = parse(&[
            (PROTOCOL_VERSION_HEADER, "1"),
            (PLATFORM_HEADER, "android"),
            (RUNTIME_VERSION_HEADER, "5"),
            (CURRENT_UPDATE_ID_HEADER, "abc"),
            (EMBEDDED_UPDATE_ID_HEADER, "def"),
            (EXPECT_SIGNATURE_HEADER, "sig, keyid=\"main\""),
        ])
        .unwrap();

        assert_eq!(
            request,
            ProtocolRequest {
                protocol: ProtocolVersion::V1,
                platform: Platform::Android,
                runtime_version: "5".to_string(),
                current_update_id: Some("abc".to_string()),
                embedded_update_id: Some("def".to_string()),
                expect_signature: true,
            }
        );
    }

    #[test]
    fn test_protocol_defaults_to_zero() {
        let request = parse(&[(PLATFORM_HEADER, "ios"), (RUNTIME_VERSION_HEADER, "1")]).unwrap();
        assert_eq!(request.protocol, ProtocolVersion::V0);
        assert!(!request.expect_signature);
    }

    #[test]
    fn test_validation_order() {
        let post = ProtocolRequest::parse(&Method::POST, &HeaderMap::new(), Ok(ManifestQuery::default()));
        assert!(matches!(post, Err(ApiError::MethodNotAllowed(_))));

        let multi = parse(&[
            (PROTOCOL_VERSION_HEADER, "0"),
            (PROTOCOL_VERSION_HEADER, "1"),
            (PLATFORM_HEADER, "web"),
        ])
        .unwrap_err();
        assert_eq!(multi.to_string(), "Unsupported protocol version. Expected either 0 or 1.");

        let garbage = parse(&[(PROTOCOL_VERSION_HEADER, "one")]).unwrap_err();
        assert_eq!(garbage.status_code().as_u16(), 400);

        let platform = parse(&[(PLATFORM_HEADER, "IOS")]).unwrap_err();
        assert_eq!(platform.to_string(), "Unsupported platform. Expected either ios or android.");

        let runtime = parse(&[(PLATFORM_HEADER, "ios"), (RUNTIME_VERSION_HEADER, "")]).unwrap_err();
        assert_eq!(runtime.to_string(), "No runtimeVersion provided.");
    }

    #[test]
    fn test_query_fallbacks() {
        let query = ManifestQuery {
            platform: Some("ios".to_string()),
            runtime_version: Some("7".to_string()),
        };
        let request = ProtocolRequest::parse(&Method::GET, &HeaderMap::new(), Ok(query)).unwrap();
        assert_eq!(request.platform, Platform::Ios);
        assert_eq!(request.runtime_version, "7");

        let query = ManifestQuery {
            platform: Some("ios".to_string()),
            runtime_version: Some("7".to_string()),
        };
        let request = ProtocolRequest::parse(
            &Method::GET,
            &headers(&[(PLATFORM_HEADER, "android"), (RUNTIME_VERSION_HEADER, "8")]),
            Ok(query),
        )
        .unwrap();
        assert_eq!(request.platform, Platform::Android);
        assert_eq!(request.runtime_version, "8");
    }

    #[test]
    fn test_repeated_query_keys_keep_first_value() {
        let pairs = [
            ("platform", "ios"),
            ("platform", "android"),
            ("runtime-version", "5"),
            ("runtime-version", "6"),
            ("channel", "beta"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string()));

        let query = ManifestQuery::from_pairs(pairs);
        assert_eq!(query.platform.as_deref(), Some("ios"));
        assert_eq!(query.runtime_version.as_deref(), Some("5"));
    }

    #[test]
    fn test_method_checked_before_query() {
        let bad_query = Err(ApiError::BadRequest("Invalid query string".to_string()));
        let post = ProtocolRequest::parse(&Method::POST, &HeaderMap::new(), bad_query);
        assert!(matches!(post, Err(ApiError::MethodNotAllowed(_))));

        let bad_query = Err(ApiError::BadRequest("Invalid query string".to_string()));
        let get = ProtocolRequest::parse(&Method::GET, &HeaderMap::new(), bad_query);
        assert!(matches!(get, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_empty_embedded_id_is_absent() {
        let request = parse(&[
            (PLATFORM_HEADER, "ios"),
            (RUNTIME_VERSION_HEADER, "1"),
            (EMBEDDED_UPDATE_ID_HEADER, ""),
        ])
        .unwrap();
        assert_eq!(request.embedded_update_id, None);
    }
}
