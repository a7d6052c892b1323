//! JSON Web Key representation for Ed25519 keys.
//!
//! Only the `OKP`/`Ed25519` shape is understood. Anything else is rejected
//! with `FederationError::InvalidKey` rather than silently skipped, so a
//! `signing_keys` claim either decodes completely or not at all.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{FederationError, Result};

use super::keys::{self, Ed25519KeyPair};

pub const KTY_OKP: &str = "OKP";
pub const CRV_ED25519: &str = "Ed25519";
pub const ALG_EDDSA: &str = "EdDSA";

/// A single JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl Jwk {
    /// Public JWK for a verifying key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self {
            kty: KTY_OKP.to_string(),
            crv: CRV_ED25519.to_string(),
            x: URL_SAFE_NO_PAD.encode(key.as_bytes()),
            d: None,
            kid: Some(keys::key_id(key)),
            key_use: Some("sig".to_string()),
            alg: Some(ALG_EDDSA.to_string()),
        }
    }

    /// Private JWK (includes `d`) for a key pair.
    pub fn from_key_pair(pair: &Ed25519KeyPair) -> Self {
        let mut jwk = Self::from_verifying_key(pair.verifying_key());
        jwk.d = Some(URL_SAFE_NO_PAD.encode(pair.signing_key_bytes().as_slice()));
        jwk
    }

    /// Whether this JWK carries private key material.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Strip private material.
    pub fn to_public(&self) -> Self {
        Self {
            d: None,
            ..self.clone()
        }
    }

    fn check_shape(&self) -> Result<()> {
        if self.kty != KTY_OKP {
            return Err(FederationError::InvalidKey(format!(
                "unsupported key type: {}",
                self.kty
            )));
        }
        if self.crv != CRV_ED25519 {
            return Err(FederationError::InvalidKey(format!(
                "unsupported curve: {}",
                self.crv
            )));
        }
        if let Some(key_use) = &self.key_use {
            if key_use != "sig" {
                return Err(FederationError::InvalidKey(format!(
                    "key use must be 'sig', got '{key_use}'"
                )));
            }
        }
        Ok(())
    }

    /// Decode the public half.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        self.check_shape()?;
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.x)
            .map_err(|e| FederationError::InvalidKey(format!("invalid base64 'x': {e}")))?;
        Ed25519KeyPair::verifying_key_from_bytes(&bytes)
    }

    /// Decode the private key pair, if `d` is present.
    ///
    /// The decoded `d` must match the published `x`.
    pub fn key_pair(&self) -> Result<Option<Ed25519KeyPair>> {
        let Some(d) = &self.d else {
            return Ok(None);
        };
        let public = self.verifying_key()?;
        let secret = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(d)
                .map_err(|_| FederationError::InvalidKey("invalid base64 'd'".into()))?,
        );
        let pair = Ed25519KeyPair::from_signing_key_bytes(&secret)?;
        if pair.verifying_key() != &public {
            return Err(FederationError::InvalidKey(
                "private key does not match public key".into(),
            ));
        }
        Ok(Some(pair))
    }
}

/// A JSON Web Key Set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Parse a JWKS from a JSON value, e.g. a `signing_keys` claim.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| FederationError::InvalidKey(format!("not a JWKS: {e}")))
    }

    /// Serialize to a JSON value suitable for a `signing_keys` claim.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "keys": self.keys })
    }

    /// Decode every public key, failing on the first malformed one.
    pub fn verifying_keys(&self) -> Result<Vec<VerifyingKey>> {
        self.keys.iter().map(Jwk::verifying_key).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
