//! Key store — the key material owned by, or trusted for, one issuer.
//!
//! A `KeyStore` holds Ed25519 keys, some with private halves (keys this
//! process may sign with) and some public only (keys imported from a
//! `signing_keys` claim or a federation operator's published JWKS).

use std::path::Path;

use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::error::{FederationError, Result};

use super::jwk::{Jwk, Jwks};
use super::keys::{self, Ed25519KeyPair};

#[derive(Clone)]
enum KeyMaterial {
    Private(Ed25519KeyPair),
    Public(VerifyingKey),
}

#[derive(Clone)]
struct StoredKey {
    kid: String,
    material: KeyMaterial,
}

impl StoredKey {
    fn verifying_key(&self) -> &VerifyingKey {
        match &self.material {
            KeyMaterial::Private(pair) => pair.verifying_key(),
            KeyMaterial::Public(key) => key,
        }
    }
}

/// Keys belonging to a single issuer.
#[derive(Clone, Default)]
pub struct KeyStore {
    issuer: String,
    keys: Vec<StoredKey>,
}

impl KeyStore {
    /// Create an empty key store for `issuer`.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            keys: Vec::new(),
        }
    }

    /// Create a key store with `count` freshly generated signing keys.
    pub fn generate(issuer: impl Into<String>, count: usize) -> Self {
        let mut store = Self::new(issuer);
        for _ in 0..count {
            store.add_key_pair(Ed25519KeyPair::generate());
        }
        store
    }

    /// Build a key store from a JWKS, keeping private halves where present.
    pub fn from_jwks(jwks: &Jwks, issuer: impl Into<String>) -> Result<Self> {
        let mut store = Self::new(issuer);
        store.import_jwks(jwks)?;
        Ok(store)
    }

    /// Read a JWKS file from disk.
    pub fn from_jwks_file(path: impl AsRef<Path>, issuer: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let jwks: Jwks = serde_json::from_slice(&bytes).map_err(|e| {
            FederationError::InvalidFileFormat(format!(
                "failed to parse JWKS file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_jwks(&jwks, issuer)
    }

    /// The issuer these keys belong to.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Add a private key pair. A key already present is replaced.
    pub fn add_key_pair(&mut self, pair: Ed25519KeyPair) {
        let kid = pair.key_id();
        self.keys.retain(|k| k.kid != kid);
        self.keys.push(StoredKey {
            kid,
            material: KeyMaterial::Private(pair),
        });
    }

    /// Add a public key. Ignored if the same key is already held.
    pub fn add_verifying_key(&mut self, key: VerifyingKey) {
        let kid = keys::key_id(&key);
        if self.keys.iter().any(|k| k.kid == kid) {
            return;
        }
        self.keys.push(StoredKey {
            kid,
            material: KeyMaterial::Public(key),
        });
    }

    /// Import every key in `jwks`.
    ///
    /// The whole set is decoded before anything is added, so a malformed
    /// key leaves the store untouched.
    pub fn import_jwks(&mut self, jwks: &Jwks) -> Result<()> {
        let mut decoded = Vec::with_capacity(jwks.keys.len());
        for jwk in &jwks.keys {
            match jwk.key_pair()? {
                Some(pair) => decoded.push(KeyMaterial::Private(pair)),
                None => decoded.push(KeyMaterial::Public(jwk.verifying_key()?)),
            }
        }
        for material in decoded {
            match material {
                KeyMaterial::Private(pair) => self.add_key_pair(pair),
                KeyMaterial::Public(key) => self.add_verifying_key(key),
            }
        }
        Ok(())
    }

    /// Copy every key of `other` into this store.
    pub fn merge(&mut self, other: &KeyStore) {
        for key in &other.keys {
            match &key.material {
                KeyMaterial::Private(pair) => self.add_key_pair(pair.clone()),
                KeyMaterial::Public(public) => self.add_verifying_key(*public),
            }
        }
    }

    /// Export the public halves of all keys.
    pub fn export_public_jwks(&self) -> Jwks {
        Jwks {
            keys: self
                .keys
                .iter()
                .map(|k| Jwk::from_verifying_key(k.verifying_key()))
                .collect(),
        }
    }

    /// Export all keys, including private halves where held.
    pub fn export_private_jwks(&self) -> Jwks {
        Jwks {
            keys: self
                .keys
                .iter()
                .map(|k| match &k.material {
                    KeyMaterial::Private(pair) => Jwk::from_key_pair(pair),
                    KeyMaterial::Public(key) => Jwk::from_verifying_key(key),
                })
                .collect(),
        }
    }

    /// The first private key, with its key id.
    pub fn signing_key(&self) -> Result<(&str, &SigningKey)> {
        self.keys
            .iter()
            .find_map(|k| match &k.material {
                KeyMaterial::Private(pair) => Some((k.kid.as_str(), pair.signing_key())),
                KeyMaterial::Public(_) => None,
            })
            .ok_or_else(|| {
                FederationError::InvalidKey(format!("no signing key held for {}", self.issuer))
            })
    }

    /// All public keys.
    pub fn verifying_keys(&self) -> impl Iterator<Item = &VerifyingKey> {
        self.keys.iter().map(StoredKey::verifying_key)
    }

    /// The public key with the given key id.
    pub fn verifying_key(&self, kid: &str) -> Option<&VerifyingKey> {
        self.keys
            .iter()
            .find(|k| k.kid == kid)
            .map(StoredKey::verifying_key)
    }

    /// Key ids of all keys.
    pub fn key_ids(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.kid.clone()).collect()
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("issuer", &self.issuer)
            .field("kids", &self.key_ids())
            .finish()
    }
}
