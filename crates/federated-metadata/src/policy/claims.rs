//! Claim narrowing along a verified chain.
//!
//! Starting from a federation operator's own statement, each statement
//! further down the chain may restate a claim only with a value that is
//! `is_lesser` than the one above it. Claims a descendant does not restate
//! are inherited; claims it introduces are added.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FederationError, Result};
use crate::statement::metadata::{
    FEDERATION_USAGE, METADATA_STATEMENTS, METADATA_STATEMENT_URIS, SIGNED_JWKS_URI,
    SIGNING_KEYS, SIGNING_KEYS_URI,
};
use crate::statement::MetadataStatement;

use super::compare::is_lesser;

const ENVELOPE_CLAIMS: [&str; 8] = ["iss", "sub", "aud", "exp", "nbf", "iat", "jti", "kid"];

const PLUMBING_CLAIMS: [&str; 7] = [
    SIGNING_KEYS,
    SIGNING_KEYS_URI,
    METADATA_STATEMENTS,
    METADATA_STATEMENT_URIS,
    SIGNED_JWKS_URI,
    FEDERATION_USAGE,
    "kid",
];

/// Which claims take part in flattening and comparison.
///
/// Passed explicitly so federations with different claim vocabularies can
/// be evaluated side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimPolicy {
    /// JWT envelope claims, dropped when flattening or comparing trees.
    pub ignore: BTreeSet<String>,
    /// Statement plumbing, never subject to subsumption.
    pub do_not_compare: BTreeSet<String>,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            ignore: ENVELOPE_CLAIMS.iter().map(|c| c.to_string()).collect(),
            do_not_compare: PLUMBING_CLAIMS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ClaimPolicy {
    /// Load a policy from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            FederationError::InvalidFileFormat(format!(
                "failed to parse claim policy {}: {e}",
                path.display()
            ))
        })
    }

    /// Also drop `claim` when flattening.
    pub fn ignoring(mut self, claim: impl Into<String>) -> Self {
        self.ignore.insert(claim.into());
        self
    }

    /// Also exclude `claim` from comparison.
    pub fn not_comparing(mut self, claim: impl Into<String>) -> Self {
        self.do_not_compare.insert(claim.into());
        self
    }

    pub fn is_ignored(&self, claim: &str) -> bool {
        self.ignore.contains(claim)
    }

    /// Whether `claim` takes part in subsumption.
    pub fn is_comparable(&self, claim: &str) -> bool {
        !self.ignore.contains(claim) && !self.do_not_compare.contains(claim)
    }
}

/// The effective claims of one federation after walking a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FederationClaims {
    /// The federation operator at the root of this path.
    pub fo: String,
    /// Signers from the root down, as established by verification.
    pub signers: Vec<String>,
    pub claims: Map<String, Value>,
}

impl FederationClaims {
    /// Claims asserted by the federation operator's own statement.
    pub fn root(fo: impl Into<String>, statement: &MetadataStatement, policy: &ClaimPolicy) -> Self {
        let fo = fo.into();
        let claims = statement
            .claims()
            .iter()
            .filter(|(k, _)| policy.is_comparable(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            signers: vec![fo.clone()],
            fo,
            claims,
        }
    }

    /// Apply a descendant statement signed by `signer`.
    ///
    /// Fails with `PolicyEscalation` on the first claim the descendant
    /// broadens.
    pub fn narrow(
        &self,
        statement: &MetadataStatement,
        signer: &str,
        policy: &ClaimPolicy,
    ) -> Result<Self> {
        let mut narrowed = Map::new();

        for (claim, allowed) in &self.claims {
            match statement.get(claim) {
                Some(asserted) if is_lesser(asserted, allowed) => {
                    narrowed.insert(claim.clone(), asserted.clone());
                }
                Some(_) => {
                    log::warn!("{signer} broadens '{claim}' granted under {}", self.fo);
                    return Err(FederationError::PolicyEscalation {
                        fo: self.fo.clone(),
                        claim: claim.clone(),
                        signer: signer.to_string(),
                    });
                }
                None => {
                    narrowed.insert(claim.clone(), allowed.clone());
                }
            }
        }

        for (claim, value) in statement.claims() {
            if policy.is_comparable(claim) && !narrowed.contains_key(claim) {
                narrowed.insert(claim.clone(), value.clone());
            }
        }

        let mut signers = self.signers.clone();
        signers.push(signer.to_string());

        Ok(Self {
            fo: self.fo.clone(),
            signers,
            claims: narrowed,
        })
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.claims.get(claim)
    }
}
