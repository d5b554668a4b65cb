//! The update protocol engine.
//!
//! - [`assets`]: content addressing of asset files
//! - [`manifest`]: manifest assembly and the no-update short-circuit
//! - [`directive`]: rollback and no-update directives
//! - [`response`]: `multipart/mixed` encoding and protocol headers

pub mod assets;
pub mod directive;
pub mod manifest;
pub mod response;

pub use manifest::{ManifestRequest, ManifestResult};
pub use response::MultipartBody;
