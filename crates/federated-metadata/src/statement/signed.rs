//! Signed statements — compact JWS tokens wrapping a metadata statement.

use serde::{Deserialize, Serialize};

use crate::crypto::{jws, KeyStore};
use crate::error::Result;

use super::metadata::MetadataStatement;

/// An opaque compact signed token.
///
/// The issuer of a signed statement is only known once the token has been
/// verified against the right key store. [`SignedStatement::unfurl`] decodes
/// the payload without that check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedStatement(String);

impl SignedStatement {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Decode the payload WITHOUT verifying the signature.
    pub fn unfurl(&self) -> Result<MetadataStatement> {
        jws::unfurl(&self.0).map(MetadataStatement::from_claims)
    }

    /// Verify the signature against `keys` and return the payload.
    ///
    /// Only the signature is checked; structural validation is
    /// [`MetadataStatement::verify`].
    pub fn verify_signature(&self, keys: &KeyStore) -> Result<MetadataStatement> {
        jws::verify(&self.0, keys).map(MetadataStatement::from_claims)
    }

    /// Key id named in the protected header, if any.
    pub fn kid(&self) -> Result<Option<String>> {
        Ok(jws::header(&self.0)?.kid)
    }
}

impl std::fmt::Display for SignedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SignedStatement {
    fn from(token: String) -> Self {
        Self(token)
    }
}
