//! Operators — federation participants that sign statements.

use indexmap::IndexMap;

use crate::crypto::{Jwks, KeyStore};
use crate::error::{FederationError, Result};
use crate::statement::{MetadataStatement, SignedStatement};
use crate::storage::KeyBundle;

use super::signing::{InternalSigningService, JwtArgs, SigningService};

/// A federation participant's signing identity.
#[derive(Debug, Clone)]
pub struct Operator {
    service: InternalSigningService,
}

impl Operator {
    pub fn new(iss: impl Into<String>, keys: KeyStore) -> Self {
        Self {
            service: InternalSigningService::new(iss, keys),
        }
    }

    pub fn iss(&self) -> &str {
        self.service.issuer()
    }

    pub fn keys(&self) -> &KeyStore {
        self.service.keys()
    }

    /// Current public signing keys, in the form placed in `signing_keys`.
    pub fn signing_keys_as_jwks(&self) -> Jwks {
        self.service.keys().export_public_jwks()
    }

    /// Sign a metadata statement as this operator.
    pub fn pack_metadata_statement(
        &self,
        statement: &MetadataStatement,
        args: &JwtArgs,
    ) -> Result<SignedStatement> {
        self.service.sign(statement, args)
    }
}

impl SigningService for Operator {
    fn issuer(&self) -> &str {
        self.iss()
    }

    fn sign(&self, statement: &MetadataStatement, args: &JwtArgs) -> Result<SignedStatement> {
        self.pack_metadata_statement(statement, args)
    }
}

/// Operators by id.
#[derive(Debug, Clone, Default)]
pub struct Operators(IndexMap<String, Operator>);

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    /// One operator per key bundle entry, signing with that entry's keys.
    pub fn from_bundle(bundle: &KeyBundle) -> Self {
        Self(
            bundle
                .iter()
                .map(|(fo, keys)| (fo.clone(), Operator::new(fo.as_str(), keys.clone())))
                .collect(),
        )
    }

    pub fn insert(&mut self, operator: Operator) {
        self.0.insert(operator.iss().to_string(), operator);
    }

    /// Look up an operator.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::UnknownOperator` if `id` is not known.
    pub fn get(&self, id: &str) -> Result<&Operator> {
        self.0
            .get(id)
            .ok_or_else(|| FederationError::UnknownOperator(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Operator> for Operators {
    fn from_iter<I: IntoIterator<Item = Operator>>(iter: I) -> Self {
        let mut ops = Self::new();
        for op in iter {
            ops.insert(op);
        }
        ops
    }
}
