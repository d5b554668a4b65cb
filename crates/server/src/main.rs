//! Updraft server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use updraft_core::config::{AppConfig, PrivateKeyConfig, SigningConfig};
use updraft_server::{AppState, create_router};
use updraft_signer::{CodeSigning, ManifestSigner};

/// Updraft - An over-the-air update server
#[derive(Parser, Debug)]
#[command(name = "updraftd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "UPDRAFT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup banner
    tracing::info!("Updraft v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    // Register Prometheus metrics
    updraft_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Open the bundle tree; fails early if the updates root is unreadable
    let store = updraft_storage::from_config(&config.updates)
        .await
        .context("failed to open updates directory")?;
    tracing::info!(root = %config.updates.root.display(), "Updates directory opened");

    // Initialize signer if configured
    let signing = match config.signing.clone().or_else(SigningConfig::from_key_path_env) {
        Some(signing_config) => CodeSigning::enabled(load_signer(&signing_config).await?),
        None => {
            tracing::warn!("No signing key configured, signed responses will be refused");
            CodeSigning::disabled()
        }
    };

    let bind = config.server.bind.clone();
    let state = AppState::new(config, store, signing);
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration. The file is optional; `UPDRAFT_` env vars override it.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!("No config file found at {}, using defaults and environment", path);
    }

    figment
        .merge(Env::prefixed("UPDRAFT_").split("__"))
        .extract()
        .context("failed to load configuration")
}

/// Load the manifest signer from configuration.
async fn load_signer(config: &SigningConfig) -> Result<ManifestSigner> {
    match &config.private_key {
        PrivateKeyConfig::File { path } => {
            let pem = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read key file: {}", path.display()))?;
            let signer = ManifestSigner::from_pem(&config.key_id, &pem)
                .context("failed to parse signing key")?;
            tracing::info!("Loaded signing key: {}", signer.key_id());
            Ok(signer)
        }
        PrivateKeyConfig::Env { var } => {
            let pem = std::env::var(var)
                .with_context(|| format!("signing key env var not set: {var}"))?;
            let signer = ManifestSigner::from_pem(&config.key_id, &pem)
                .context("failed to parse signing key")?;
            tracing::info!("Loaded signing key from env: {}", signer.key_id());
            Ok(signer)
        }
        PrivateKeyConfig::Generate => {
            tracing::warn!("Generating ephemeral signing key (not suitable for production)");
            let signer = tokio::task::spawn_blocking({
                let key_id = config.key_id.clone();
                move || ManifestSigner::generate(key_id)
            })
            .await
            .context("key generation task failed")?
            .context("failed to generate signing key")?;
            tracing::info!("Generated signing key: {}", signer.key_id());
            Ok(signer)
        }
        PrivateKeyConfig::Value { key } => {
            tracing::warn!("Using inline signing key (not recommended for production)");
            let signer = ManifestSigner::from_pem(&config.key_id, key)
                .context("failed to parse signing key")?;
            tracing::info!("Loaded signing key: {}", signer.key_id());
            Ok(signer)
        }
    }
}
