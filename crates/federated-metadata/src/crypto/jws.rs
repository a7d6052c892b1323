//! Compact JWS (`EdDSA`) signing, verification and decoding.
//!
//! Tokens are produced and checked with `jsonwebtoken`. Decoding a payload
//! (`unfurl`) and verifying a token (`verify`) are separate operations:
//! `unfurl` never checks a signature. Envelope claims (`exp`, `aud`) are
//! left to the statement layer, so neither call validates them.

use ed25519_dalek::pkcs8::{EncodePrivateKey, KeypairBytes};
use ed25519_dalek::SigningKey;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};

use crate::error::{FederationError, Result};

use super::jwk::Jwk;
use super::key_store::KeyStore;

fn encoding_key(key: &SigningKey) -> Result<EncodingKey> {
    let der = KeypairBytes {
        secret_key: key.to_bytes(),
        public_key: None,
    }
    .to_pkcs8_der()
    .map_err(|e| FederationError::InvalidKey(format!("cannot encode signing key: {e}")))?;
    Ok(EncodingKey::from_ed_der(der.as_bytes()))
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation
}

fn invalid_token(e: jsonwebtoken::errors::Error) -> FederationError {
    FederationError::InvalidToken(format!("cannot decode token: {e}"))
}

/// Sign a claim set.
pub fn sign(claims: &Map<String, Value>, kid: &str, key: &SigningKey) -> Result<String> {
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(&header, claims, &encoding_key(key)?)
        .map_err(|e| FederationError::InvalidKey(format!("signing failed: {e}")))
}

/// Decode the protected header.
pub fn header(token: &str) -> Result<Header> {
    jsonwebtoken::decode_header(token.trim()).map_err(invalid_token)
}

/// Return the payload of a token WITHOUT verifying its signature.
///
/// The result is untrusted input. Use [`verify`] before relying on it.
pub fn unfurl(token: &str) -> Result<Map<String, Value>> {
    let mut validation = validation();
    validation.insecure_disable_signature_validation();
    jsonwebtoken::decode::<Map<String, Value>>(
        token.trim(),
        &DecodingKey::from_secret(&[]),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(invalid_token)
}

/// Verify a token against the keys in `keys` and return its payload.
///
/// When the header names a `kid` held by the store only that key is tried;
/// otherwise every key is tried in turn.
pub fn verify(token: &str, keys: &KeyStore) -> Result<Map<String, Value>> {
    let token = token.trim();
    let header = header(token)?;
    if header.alg != Algorithm::EdDSA {
        return Err(FederationError::signature(
            keys.issuer(),
            format!("unsupported algorithm {:?}", header.alg),
        ));
    }

    let jwks = keys.export_public_jwks();
    let named: Vec<&Jwk> = match header.kid.as_deref() {
        Some(kid) => jwks
            .keys
            .iter()
            .filter(|jwk| jwk.kid.as_deref() == Some(kid))
            .collect(),
        None => Vec::new(),
    };
    let candidates = if named.is_empty() {
        jwks.keys.iter().collect()
    } else {
        named
    };

    let validation = validation();
    for jwk in candidates {
        let key = DecodingKey::from_ed_components(&jwk.x)
            .map_err(|e| FederationError::InvalidKey(format!("unusable key: {e}")))?;
        match jsonwebtoken::decode::<Map<String, Value>>(token, &key, &validation) {
            Ok(data) => return Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => continue,
            Err(e) => return Err(invalid_token(e)),
        }
    }

    Err(FederationError::signature(
        keys.issuer(),
        "no matching key verified the signature",
    ))
}
