//! HTTP server for over-the-air application updates.
//!
//! This crate provides the protocol endpoint:
//! - Request validation and protocol-version negotiation
//! - Manifest, rollback and no-update responses
//! - Optional RSA signing of response parts
//! - `multipart/mixed` response encoding
//! - Health and metrics endpoints

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod protocol;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use middleware::TraceId;
pub use routes::create_router;
pub use state::AppState;
