//! Metadata statements — ordered claim sets with structural invariants.
//!
//! A metadata statement describes an entity's configuration or policy. It
//! names its signing keys (inline or by pointer) and may nest statements
//! issued by federation operators, either embedded or by URI.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::Jwks;
use crate::error::{FederationError, Result};

use super::signed::SignedStatement;

pub const SIGNING_KEYS: &str = "signing_keys";
pub const SIGNING_KEYS_URI: &str = "signing_keys_uri";
pub const METADATA_STATEMENTS: &str = "metadata_statements";
pub const METADATA_STATEMENT_URIS: &str = "metadata_statement_uris";
pub const SIGNED_JWKS_URI: &str = "signed_jwks_uri";
pub const FEDERATION_USAGE: &str = "federation_usage";

/// JWT envelope claims.
pub const ISS: &str = "iss";
pub const AUD: &str = "aud";
pub const IAT: &str = "iat";
pub const EXP: &str = "exp";

/// An ordered mapping of claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStatement(Map<String, Value>);

impl MetadataStatement {
    /// An empty statement.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap an existing claim map.
    pub fn from_claims(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Parse from a JSON value; anything but an object is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(claims) => Ok(Self(claims)),
            other => Err(FederationError::Validation(format!(
                "metadata statement must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_claims(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn contains(&self, claim: &str) -> bool {
        self.0.contains_key(claim)
    }

    pub fn insert(&mut self, claim: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(claim.into(), value)
    }

    pub fn remove(&mut self, claim: &str) -> Option<Value> {
        self.0.remove(claim)
    }

    /// Merge `claims` into this statement; incoming values win.
    pub fn update(&mut self, claims: &Map<String, Value>) {
        for (k, v) in claims {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// The `iss` claim, if present. Untrusted until the token is verified.
    pub fn issuer(&self) -> Option<&str> {
        self.0.get(ISS).and_then(Value::as_str)
    }

    /// The `exp` claim, if present.
    pub fn expires_at(&self) -> Result<Option<i64>> {
        match self.0.get(EXP) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                FederationError::Validation(format!("\"{EXP}\" must be an integer, got {value}"))
            }),
        }
    }

    /// Fail if the statement has an `exp` at or before `now`.
    ///
    /// Statements without `exp` never expire.
    pub fn check_expiry(&self, now: i64) -> Result<()> {
        match self.expires_at()? {
            Some(exp) if exp <= now => Err(FederationError::Expired {
                issuer: self.issuer().unwrap_or("<unknown>").to_string(),
                exp,
            }),
            _ => Ok(()),
        }
    }

    /// Set `signing_keys` to a public key set.
    pub fn set_signing_keys(&mut self, jwks: &Jwks) {
        self.0.insert(SIGNING_KEYS.to_string(), jwks.to_value());
    }

    /// Decode the inline `signing_keys`, if present.
    pub fn signing_keys(&self) -> Result<Option<Jwks>> {
        match self.0.get(SIGNING_KEYS) {
            None => Ok(None),
            Some(value) => {
                let jwks = Jwks::from_value(value).map_err(|e| {
                    FederationError::Validation(format!("\"{SIGNING_KEYS}\" not a proper JWKS: {e}"))
                })?;
                Ok(Some(jwks))
            }
        }
    }

    /// Nested signed statements keyed by federation operator id.
    pub fn metadata_statements(&self) -> Result<IndexMap<String, SignedStatement>> {
        Ok(string_mapping(self.0.get(METADATA_STATEMENTS), METADATA_STATEMENTS)?
            .into_iter()
            .map(|(fo, token)| (fo, SignedStatement::new(token)))
            .collect())
    }

    /// Nested statement pointers keyed by federation operator id.
    pub fn metadata_statement_uris(&self) -> Result<IndexMap<String, String>> {
        string_mapping(self.0.get(METADATA_STATEMENT_URIS), METADATA_STATEMENT_URIS)
    }

    pub fn set_metadata_statements(&mut self, statements: &IndexMap<String, SignedStatement>) {
        let map: Map<String, Value> = statements
            .iter()
            .map(|(fo, token)| (fo.clone(), Value::from(token.as_str())))
            .collect();
        self.0
            .insert(METADATA_STATEMENTS.to_string(), Value::Object(map));
    }

    pub fn set_metadata_statement_uris(&mut self, uris: &IndexMap<String, String>) {
        let map: Map<String, Value> = uris
            .iter()
            .map(|(fo, uri)| (fo.clone(), Value::from(uri.as_str())))
            .collect();
        self.0
            .insert(METADATA_STATEMENT_URIS.to_string(), Value::Object(map));
    }

    /// Check the structural invariants of a metadata statement.
    ///
    /// Fails when:
    /// - both `signing_keys` and `signing_keys_uri` are present, or neither is;
    /// - `signing_keys` is not a JWKS of public Ed25519 keys;
    /// - `metadata_statements` or `metadata_statement_uris` is not a
    ///   mapping of strings;
    /// - the two mappings share a key.
    pub fn verify(&self) -> Result<()> {
        match (self.contains(SIGNING_KEYS), self.contains(SIGNING_KEYS_URI)) {
            (true, true) => {
                return Err(FederationError::Validation(format!(
                    "you can only have one of \"{SIGNING_KEYS}\" and \"{SIGNING_KEYS_URI}\" in a metadata statement"
                )))
            }
            (false, false) => {
                return Err(FederationError::Validation(format!(
                    "a metadata statement needs \"{SIGNING_KEYS}\" or \"{SIGNING_KEYS_URI}\""
                )))
            }
            _ => {}
        }

        if let Some(jwks) = self.signing_keys()? {
            if jwks.keys.iter().any(|k| k.is_private()) {
                return Err(FederationError::Validation(format!(
                    "\"{SIGNING_KEYS}\" must only carry public keys"
                )));
            }
            jwks.verifying_keys().map_err(|e| {
                FederationError::Validation(format!("\"{SIGNING_KEYS}\" not a proper JWKS: {e}"))
            })?;
        }

        if let Some(uri) = self.0.get(SIGNING_KEYS_URI) {
            if !uri.is_string() {
                return Err(FederationError::Validation(format!(
                    "\"{SIGNING_KEYS_URI}\" must be a string"
                )));
            }
        }

        let embedded = self.metadata_statements()?;
        let uris = self.metadata_statement_uris()?;
        if let Some(fo) = embedded.keys().find(|fo| uris.contains_key(*fo)) {
            return Err(FederationError::Validation(format!(
                "you should not have the same key ({fo}) in \"{METADATA_STATEMENTS}\" and in \"{METADATA_STATEMENT_URIS}\""
            )));
        }

        Ok(())
    }
}

impl From<Map<String, Value>> for MetadataStatement {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

fn string_mapping(value: Option<&Value>, claim: &str) -> Result<IndexMap<String, String>> {
    let Some(value) = value else {
        return Ok(IndexMap::new());
    };
    let Value::Object(map) = value else {
        return Err(FederationError::Validation(format!(
            "\"{claim}\" must be a mapping"
        )));
    };
    map.iter()
        .map(|(k, v)| match v.as_str() {
            Some(s) => Ok((k.clone(), s.to_string())),
            None => Err(FederationError::Validation(format!(
                "\"{claim}\" entry {k} must be a string"
            ))),
        })
        .collect()
}
