//! Ed25519 key pair generation.
//!
//! Every federation operator signs with Ed25519. Key ids are derived from
//! the public key so that the same key always carries the same `kid`.

use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{FederationError, Result};

/// An Ed25519 key pair for signing operations.
///
/// `SigningKey` zeroizes its secret on drop.
#[derive(Clone)]
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519KeyPair {
    /// Generate a new random Ed25519 key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from raw signing key bytes.
    pub fn from_signing_key_bytes(bytes: &[u8]) -> Result<Self> {
        let array: Zeroizing<[u8; 32]> = Zeroizing::new(
            bytes
                .try_into()
                .map_err(|_| FederationError::InvalidKey("signing key must be 32 bytes".into()))?,
        );
        let signing_key = SigningKey::from_bytes(&array);
        let verifying_key = signing_key.verifying_key();
        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Reconstruct a verifying key from raw bytes.
    pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| FederationError::InvalidKey("verifying key must be 32 bytes".into()))?;
        VerifyingKey::from_bytes(&array)
            .map_err(|e| FederationError::InvalidKey(format!("invalid verifying key: {e}")))
    }

    /// Return a reference to the signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Return the signing key bytes, wiped when the wrapper is dropped.
    pub fn signing_key_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// Return the verifying key bytes.
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Key id of this pair's public half.
    pub fn key_id(&self) -> String {
        key_id(&self.verifying_key)
    }
}

/// Derive a key id from a verifying key.
///
/// Format: base58 of the first 16 bytes of SHA-256(public_key).
pub fn key_id(key: &VerifyingKey) -> String {
    let hash = Sha256::digest(key.as_bytes());
    bs58::encode(&hash[..16]).into_string()
}
