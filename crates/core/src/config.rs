//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Environment variable that names a PEM private key file when no `signing` section is configured.
pub const PRIVATE_KEY_PATH_ENV: &str = "PRIVATE_KEY_PATH";

/// Deployment environment. Controls how much failure detail reaches clients.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Public base URL prefixed to asset URLs in manifests.
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
    /// Extra request headers the client sends when fetching each asset.
    /// Returned per asset key in the `extensions` part of manifest responses.
    #[serde(default)]
    pub asset_request_headers: BTreeMap<String, String>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_hostname() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            hostname: default_hostname(),
            environment: Environment::default(),
            asset_request_headers: BTreeMap::new(),
        }
    }
}

/// Location and layout of the published bundle tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdatesConfig {
    /// Root directory containing `<runtimeVersion>/<publishTimestamp>/` bundles.
    #[serde(default = "default_updates_root")]
    pub root: PathBuf,
    /// Name of the app config document inside each bundle.
    #[serde(default = "default_config_file")]
    pub config_file: String,
}

fn default_updates_root() -> PathBuf {
    PathBuf::from("./updates")
}

fn default_config_file() -> String {
    crate::bundle::DEFAULT_CONFIG_FILE.to_string()
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            root: default_updates_root(),
            config_file: default_config_file(),
        }
    }
}

impl UpdatesConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.config_file.as_str();
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(format!(
                "updates.config_file must be a plain file name, got {name:?}"
            ));
        }
        if name == crate::bundle::METADATA_FILE || name == crate::bundle::ROLLBACK_MARKER {
            return Err(format!("updates.config_file must not be {name:?}"));
        }
        Ok(())
    }
}

/// Code signing configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Key identifier sent as `keyid` in the signature header.
    #[serde(default = "default_key_id")]
    pub key_id: String,
    /// Private key source.
    pub private_key: PrivateKeyConfig,
}

fn default_key_id() -> String {
    "main".to_string()
}

impl SigningConfig {
    /// Build a file-backed signing config from [`PRIVATE_KEY_PATH_ENV`], if it is set.
    pub fn from_key_path_env() -> Option<Self> {
        let path = std::env::var_os(PRIVATE_KEY_PATH_ENV)?;
        if path.is_empty() {
            return None;
        }
        Some(Self {
            key_id: default_key_id(),
            private_key: PrivateKeyConfig::File {
                path: PathBuf::from(path),
            },
        })
    }
}

/// Private key source configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrivateKeyConfig {
    /// PEM key stored in a file.
    File {
        /// Path to the private key file.
        path: PathBuf,
    },
    /// PEM key stored in an environment variable.
    Env {
        /// Environment variable name.
        var: String,
    },
    /// PEM key provided directly as a value (NOT recommended for production).
    Value {
        /// The PEM-encoded key.
        key: String,
    },
    /// Generate a new key at startup (for development only).
    Generate,
}

/// Prometheus metrics configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve `/metrics`.
    /// When enabled, restrict access to the endpoint at the network level.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Bundle tree configuration.
    #[serde(default)]
    pub updates: UpdatesConfig,
    /// Signing configuration (optional).
    pub signing: Option<SigningConfig>,
    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Create a test configuration serving bundles from `updates_root`.
    ///
    /// **For testing only.** Runs in development mode so error bodies carry detail.
    pub fn for_testing(updates_root: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                hostname: "http://updates.test".to_string(),
                environment: Environment::Development,
                ..Default::default()
            },
            updates: UpdatesConfig {
                root: updates_root.into(),
                ..Default::default()
            },
            signing: None,
            metrics: MetricsConfig::default(),
        }
    }
}
