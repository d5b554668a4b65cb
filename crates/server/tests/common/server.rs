//! Server test utilities.

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;
use updraft_core::config::AppConfig;
use updraft_server::{AppState, create_router};
use updraft_signer::{CodeSigning, ManifestSigner};

use super::fixtures::TEST_PRIVATE_KEY;

/// A test server over a temporary updates directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    updates_root: PathBuf,
    _temp_dir: TempDir,
}

/// A buffered response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server without a signing key.
    pub async fn new() -> Self {
        Self::build(|_| {}, CodeSigning::disabled()).await
    }

    /// Create a test server that signs with the fixture key.
    pub async fn with_signing() -> Self {
        let signer =
            ManifestSigner::from_pem("main", TEST_PRIVATE_KEY).expect("Failed to load fixture key");
        Self::build(|_| {}, CodeSigning::enabled(signer)).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build(modifier, CodeSigning::disabled()).await
    }

    async fn build<F>(modifier: F, signing: CodeSigning) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let updates_root = temp_dir.path().join("updates");
        std::fs::create_dir_all(&updates_root).expect("Failed to create updates directory");

        let mut config = AppConfig::for_testing(&updates_root);
        modifier(&mut config);

        let store = updraft_storage::from_config(&config.updates)
            .await
            .expect("Failed to open updates directory");
        let state = AppState::new(config, store, signing);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            updates_root,
            _temp_dir: temp_dir,
        }
    }

    /// Directory bundles are published into.
    pub fn updates_root(&self) -> &Path {
        &self.updates_root
    }

    /// Send a request with the given headers.
    pub async fn request(&self, method: Method, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8(body_bytes.to_vec()).expect("response body is not UTF-8"),
        }
    }

    /// GET the manifest endpoint.
    pub async fn get_manifest(&self, headers: &[(&str, &str)]) -> TestResponse {
        self.request(Method::GET, "/api/manifest", headers).await
    }
}
