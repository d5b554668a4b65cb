//! Prometheus metrics for the update server.
//!
//! Metrics carry no client identifiers; the only label is the response
//! outcome. The `/metrics` route can be disabled with `metrics.enabled = false`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Manifest endpoint
pub static MANIFEST_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "updraft_manifest_requests_total",
            "Manifest endpoint requests by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static MANIFEST_BUILD_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "updraft_manifest_build_duration_seconds",
            "Time taken to resolve, build and encode a manifest response",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
        ]),
    )
    .expect("metric creation failed")
});

// Signing and hashing
pub static SIGNATURES_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "updraft_signatures_total",
        "Total number of manifest and directive signatures produced",
    )
    .expect("metric creation failed")
});

pub static ASSETS_HASHED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "updraft_assets_hashed_total",
        "Total number of asset files read and content-addressed",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(MANIFEST_REQUESTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(MANIFEST_BUILD_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SIGNATURES_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ASSETS_HASHED.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record the outcome of one manifest request.
pub fn record_outcome(outcome: &str) {
    MANIFEST_REQUESTS.with_label_values(&[outcome]).inc();
}
