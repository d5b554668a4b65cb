//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported platform: {0} (expected ios or android)")]
    InvalidPlatform(String),

    #[error("invalid protocol version: {0}")]
    InvalidProtocolVersion(String),

    #[error("invalid bundle metadata: {0}")]
    InvalidMetadata(String),

    #[error("platform {0} is not listed in bundle metadata")]
    PlatformNotListed(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
