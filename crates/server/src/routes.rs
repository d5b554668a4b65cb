//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::middleware::{cors_middleware, trace_middleware};
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{any, get};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Every method reaches the handler so non-GET gets a protocol error body
        .route("/api/manifest", any(handlers::get_manifest))
        .route("/health", get(handlers::health_check));

    // When enabled, this endpoint must be network-restricted to scrapers.
    if state.config.metrics.enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Order of execution: TraceLayer -> trace id -> CORS -> Handler
    router
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
