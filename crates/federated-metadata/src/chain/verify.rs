//! Chain verification and flattening.
//!
//! A grounded tree is verified leaves first. A statement without nesting
//! was signed by a federation operator and is checked against that
//! operator's keys in the [`KeyBundle`]. Every other statement is checked
//! against the `signing_keys` its verified children vouch for. Once the
//! tree is verified, [`flatten`] walks each root-to-leaf path and narrows
//! the federation operator's claims by every statement below it.

use indexmap::IndexMap;

use crate::crypto::KeyStore;
use crate::error::{FederationError, Result};
use crate::policy::{ClaimPolicy, FederationClaims};
use crate::statement::metadata::{METADATA_STATEMENTS, METADATA_STATEMENT_URIS};
use crate::statement::MetadataStatement;
use crate::storage::KeyBundle;

use super::resolver::GroundedStatement;

/// A statement tree whose every signature has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedStatement {
    /// Key the statement sits under in its parent.
    pub id: String,
    /// Verified issuer.
    pub issuer: String,
    /// Verified payload, without its nested statement claims.
    pub statement: MetadataStatement,
    pub nested: IndexMap<String, VerifiedStatement>,
}

/// Collect the inline `signing_keys` of `statements` into one key store.
///
/// Statements that only point at their keys with `signing_keys_uri`
/// contribute nothing.
pub fn keys_from_statements<'a, I>(issuer: &str, statements: I) -> Result<KeyStore>
where
    I: IntoIterator<Item = &'a MetadataStatement>,
{
    let mut keys = KeyStore::new(issuer);
    for statement in statements {
        match statement.signing_keys()? {
            Some(jwks) => keys.import_jwks(&jwks)?,
            None => log::debug!(
                "statement from {} carries no inline signing keys",
                statement.issuer().unwrap_or("<unknown>")
            ),
        }
    }
    Ok(keys)
}

/// Verify every signature in a grounded tree.
///
/// `key` names the tree's position: for a statement without nesting it is
/// the federation operator whose keys must have signed it.
///
/// # Errors
///
/// Returns `FederationError::UnknownFederationOperator` if a root of the
/// tree is not in `bundle`, `FederationError::SignatureInvalid` if a
/// signature does not verify or nested statements vouch for no inline
/// keys, `FederationError::Expired` if a statement's `exp` has passed, or
/// `FederationError::Validation` if a verified payload breaks the
/// statement invariants.
pub fn verify_grounded(
    key: &str,
    grounded: &GroundedStatement,
    bundle: &KeyBundle,
) -> Result<VerifiedStatement> {
    let (payload, nested) = if grounded.is_leaf() {
        let keys = bundle.get(key)?;
        (check_signature(key, grounded, keys)?, IndexMap::new())
    } else {
        let mut nested = IndexMap::new();
        for (child_key, child) in &grounded.nested {
            nested.insert(child_key.clone(), verify_grounded(child_key, child, bundle)?);
        }
        let keys = keys_from_statements(key, nested.values().map(|v| &v.statement))?;
        if keys.is_empty() {
            log::warn!("nothing nested in {key} vouches for its signing keys");
            return Err(FederationError::signature(
                key,
                "no nested statement carries inline signing_keys",
            ));
        }
        (check_signature(key, grounded, &keys)?, nested)
    };

    payload.verify()?;
    payload.check_expiry(crate::time::now_secs()).map_err(|e| {
        log::warn!("statement under {key} rejected: {e}");
        e
    })?;

    let mut statement = payload;
    statement.remove(METADATA_STATEMENTS);
    statement.remove(METADATA_STATEMENT_URIS);
    let issuer = statement.issuer().unwrap_or(key).to_string();

    Ok(VerifiedStatement {
        id: key.to_string(),
        issuer,
        statement,
        nested,
    })
}

fn check_signature(
    key: &str,
    grounded: &GroundedStatement,
    keys: &KeyStore,
) -> Result<MetadataStatement> {
    grounded.token.verify_signature(keys).map_err(|e| {
        log::warn!("statement under {key} failed verification: {e}");
        e
    })
}

/// Drop every branch not rooted in a federation operator of `bundle`.
///
/// Returns `None` when nothing remains.
pub fn trusted_subtree(
    key: &str,
    grounded: &GroundedStatement,
    bundle: &KeyBundle,
) -> Option<GroundedStatement> {
    if grounded.is_leaf() {
        return bundle.contains(key).then(|| grounded.clone());
    }
    let nested: IndexMap<String, GroundedStatement> = grounded
        .nested
        .iter()
        .filter_map(|(k, child)| trusted_subtree(k, child, bundle).map(|c| (k.clone(), c)))
        .collect();
    if nested.is_empty() {
        return None;
    }
    Some(GroundedStatement {
        token: grounded.token.clone(),
        unverified: grounded.unverified.clone(),
        nested,
    })
}

/// The effective claims of every federation path through a verified tree.
///
/// # Errors
///
/// Returns `FederationError::PolicyEscalation` if any statement broadens a
/// claim asserted above it.
pub fn flatten(verified: &VerifiedStatement, policy: &ClaimPolicy) -> Result<Vec<FederationClaims>> {
    if verified.nested.is_empty() {
        return Ok(vec![FederationClaims::root(
            verified.id.as_str(),
            &verified.statement,
            policy,
        )]);
    }

    let mut paths = Vec::new();
    for child in verified.nested.values() {
        for claims in flatten(child, policy)? {
            paths.push(claims.narrow(&verified.statement, &verified.issuer, policy)?);
        }
    }
    Ok(paths)
}

/// Verify a grounded tree and flatten it.
pub fn evaluate(
    key: &str,
    grounded: &GroundedStatement,
    bundle: &KeyBundle,
    policy: &ClaimPolicy,
) -> Result<Vec<FederationClaims>> {
    let verified = verify_grounded(key, grounded, bundle)?;
    flatten(&verified, policy)
}

/// Verify and flatten only the branches of a tree rooted in `bundle`.
///
/// The tree is keyed by its own (unverified) issuer. Branches rooted in
/// federation operators outside `bundle` are dropped first.
///
/// # Errors
///
/// Returns `FederationError::UnknownFederationOperator`, naming the roots,
/// if no branch is rooted in `bundle`, and any error of [`evaluate`] on
/// the remaining tree.
pub fn evaluate_trusted(
    grounded: &GroundedStatement,
    bundle: &KeyBundle,
    policy: &ClaimPolicy,
) -> Result<Vec<FederationClaims>> {
    let key = grounded.unverified.issuer().unwrap_or_default().to_string();
    let trusted = trusted_subtree(&key, grounded, bundle).ok_or_else(|| {
        let roots = if grounded.is_leaf() {
            key.clone()
        } else {
            grounded.root_keys().join(", ")
        };
        FederationError::UnknownFederationOperator(roots)
    })?;
    evaluate(&key, &trusted, bundle, policy)
}
