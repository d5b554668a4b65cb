//! Application state shared across handlers.

use std::sync::Arc;
use updraft_core::config::AppConfig;
use updraft_signer::CodeSigning;
use updraft_storage::BundleStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Published bundle tree.
    pub store: BundleStore,
    /// Code-signing capability; disabled when no key was loaded at startup.
    pub signing: CodeSigning,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, store: BundleStore, signing: CodeSigning) -> Self {
        if config.server.environment.is_development() {
            tracing::warn!("Running in development mode; error responses include debug detail");
        }
        if !signing.is_available() {
            tracing::warn!("No signing key loaded; signed responses will be refused");
        }

        Self {
            config: Arc::new(config),
            store,
            signing,
        }
    }

    /// Whether error responses should carry debug detail.
    pub fn include_error_detail(&self) -> bool {
        self.config.server.environment.is_development()
    }
}
