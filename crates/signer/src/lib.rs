//! Code signing for update manifests and directives.
//!
//! This crate provides:
//! - RSA key parsing and generation
//! - RSA-SHA256 signing and verification
//! - `expo-signature` structured header encoding
//! - The injectable [`CodeSigning`] capability

pub mod error;
pub mod key;
pub mod sfv;
pub mod signer;

pub use error::{SignerError, SignerResult};
pub use key::{PublicKey, SecretKey};
pub use signer::{CodeSigning, ManifestSigner, verify_signature, verify_signature_header};
