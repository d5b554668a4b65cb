//! RSA-SHA256 signing of manifest and directive bodies.

use crate::error::{SignerError, SignerResult};
use crate::key::{DEFAULT_KEY_BITS, PublicKey, SecretKey};
use crate::sfv;
use base64::Engine;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer as _, Verifier as _};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

/// Signs response bodies with a single RSA key (PKCS#1 v1.5, SHA-256).
pub struct ManifestSigner {
    key_id: String,
    secret: SecretKey,
    signing_key: SigningKey<Sha256>,
}

impl ManifestSigner {
    /// Create a new signer from a secret key.
    pub fn new(key_id: impl Into<String>, secret: SecretKey) -> Self {
        let signing_key = SigningKey::<Sha256>::new(secret.rsa_key().clone());
        Self {
            key_id: key_id.into(),
            secret,
            signing_key,
        }
    }

    /// Create from a PEM private key.
    pub fn from_pem(key_id: impl Into<String>, pem: &str) -> SignerResult<Self> {
        Ok(Self::new(key_id, SecretKey::from_pem(pem)?))
    }

    /// Generate a new signer with a random key.
    pub fn generate(key_id: impl Into<String>) -> SignerResult<Self> {
        Ok(Self::new(key_id, SecretKey::generate(DEFAULT_KEY_BITS)?))
    }

    /// Get the key id.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Sign data and return the standard base64 signature.
    pub fn sign(&self, data: &[u8]) -> SignerResult<String> {
        let signature: Signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()))
    }

    /// Sign data and encode the result as an `expo-signature` header value.
    pub fn signature_header(&self, data: &[u8]) -> SignerResult<String> {
        let sig = self.sign(data)?;
        sfv::serialize_dictionary([("sig", sig.as_str()), ("keyid", self.key_id.as_str())])
    }
}

impl fmt::Debug for ManifestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestSigner")
            .field("key_id", &self.key_id)
            .field("public", &self.secret.public_key())
            .finish()
    }
}

/// Verify a base64 signature over `data`.
pub fn verify_signature(data: &[u8], signature_b64: &str, public_key: &PublicKey) -> SignerResult<()> {
    let sig_bytes = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .map_err(|e| SignerError::InvalidSignature(format!("invalid base64: {e}")))?;

    let signature = Signature::try_from(sig_bytes.as_slice())
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

    VerifyingKey::<Sha256>::new(public_key.rsa_key().clone())
        .verify(data, &signature)
        .map_err(|_| SignerError::VerificationFailed)
}

/// Verify an `expo-signature` header value over `data`.
pub fn verify_signature_header(data: &[u8], header: &str, public_key: &PublicKey) -> SignerResult<()> {
    let members = sfv::parse_dictionary(header)?;
    let sig = members
        .iter()
        .find(|(key, _)| key == "sig")
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| SignerError::InvalidHeader("missing sig".to_string()))?;
    verify_signature(data, sig, public_key)
}

/// The process-wide code-signing capability.
///
/// Holds the signer when a key was loaded at startup. Cloning is cheap and
/// the key is never replaced; rotating it requires a restart.
#[derive(Clone, Debug, Default)]
pub struct CodeSigning {
    signer: Option<Arc<ManifestSigner>>,
}

impl CodeSigning {
    /// Signing with the given signer.
    pub fn enabled(signer: ManifestSigner) -> Self {
        Self {
            signer: Some(Arc::new(signer)),
        }
    }

    /// No key loaded; every signing attempt fails with [`SignerError::Unavailable`].
    pub fn disabled() -> Self {
        Self { signer: None }
    }

    pub fn is_available(&self) -> bool {
        self.signer.is_some()
    }

    /// Get the signer, if one is loaded.
    pub fn signer(&self) -> Option<&ManifestSigner> {
        self.signer.as_deref()
    }

    /// Sign `data` and encode the `expo-signature` header value.
    pub fn signature_header(&self, data: &[u8]) -> SignerResult<String> {
        self.signer
            .as_deref()
            .ok_or(SignerError::Unavailable)?
            .signature_header(data)
    }
}
