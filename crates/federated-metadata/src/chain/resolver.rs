//! Chain resolver — decodes a chain into an explicit tree.
//!
//! Nothing here verifies a signature. [`unpack`] follows
//! `metadata_statement_uris` through a [`MetadataStore`]; [`ground`] decodes
//! embedded `metadata_statements`. Both produce a [`GroundedStatement`]
//! whose nested statements are all inlined, ready for
//! [`verify_grounded`](super::verify::verify_grounded).

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{FederationError, Result};
use crate::policy::ClaimPolicy;
use crate::statement::metadata::{METADATA_STATEMENTS, METADATA_STATEMENT_URIS};
use crate::statement::{MetadataStatement, SignedStatement};
use crate::storage::MetadataStore;

/// Deepest nesting followed before a chain is rejected.
pub const MAX_CHAIN_DEPTH: usize = 32;

/// A decoded, not yet verified, statement tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedStatement {
    /// The signed token this node was decoded from.
    pub token: SignedStatement,
    /// The decoded payload without its nested statement claims.
    pub unverified: MetadataStatement,
    /// Nested statements keyed as in the parent.
    pub nested: IndexMap<String, GroundedStatement>,
}

impl GroundedStatement {
    pub fn is_leaf(&self) -> bool {
        self.nested.is_empty()
    }

    /// Number of statements in the tree.
    pub fn size(&self) -> usize {
        1 + self.nested.values().map(GroundedStatement::size).sum::<usize>()
    }

    /// Longest path from this node to a statement without nesting.
    pub fn depth(&self) -> usize {
        1 + self
            .nested
            .values()
            .map(GroundedStatement::depth)
            .max()
            .unwrap_or(0)
    }

    /// Keys of every statement without nesting, i.e. the federation
    /// operators this tree is rooted in.
    pub fn root_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for (key, child) in &self.nested {
            if child.is_leaf() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            } else {
                for k in child.root_keys() {
                    if !keys.contains(&k) {
                        keys.push(k);
                    }
                }
            }
        }
        keys
    }

    /// The claims of the whole tree as JSON, without `policy.ignore`
    /// claims and with nested statements inlined under
    /// `metadata_statements`.
    ///
    /// Two trees built from the same path compare equal here regardless of
    /// whether they were embedded or indirected.
    pub fn claim_tree(&self, policy: &ClaimPolicy) -> Value {
        let mut tree: Map<String, Value> = self
            .unverified
            .claims()
            .iter()
            .filter(|(k, _)| !policy.is_ignored(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !self.nested.is_empty() {
            let nested = self
                .nested
                .iter()
                .map(|(k, child)| (k.clone(), child.claim_tree(policy)))
                .collect();
            tree.insert(METADATA_STATEMENTS.to_string(), Value::Object(nested));
        }
        Value::Object(tree)
    }
}

/// Store key named by a reference: the key itself, or a URL whose last
/// path segment is the key.
pub fn reference_key(reference: &str) -> Result<String> {
    let key = match url::Url::parse(reference) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .unwrap_or_default(),
        Err(_) => reference.rsplit('/').next().unwrap_or_default().to_string(),
    };
    if key.is_empty() {
        return Err(FederationError::Validation(format!(
            "reference '{reference}' names no statement"
        )));
    }
    Ok(key)
}

/// Resolve a reference through `store` and decode the whole tree.
///
/// # Errors
///
/// Returns `FederationError::NotFound` for a reference not in `store`
/// (references are never fetched), `FederationError::InvalidToken` for
/// undecodable tokens, or `FederationError::Validation` for chains nested
/// deeper than [`MAX_CHAIN_DEPTH`].
pub fn unpack(reference: &str, store: &MetadataStore) -> Result<GroundedStatement> {
    let key = reference_key(reference)?;
    let token = store.get(&key)?;
    resolve(&token, Some(store), 0)
}

/// Decode a token and everything nested in it, following indirected
/// statements through `store`.
pub fn unpack_statement(token: &SignedStatement, store: &MetadataStore) -> Result<GroundedStatement> {
    resolve(token, Some(store), 0)
}

/// Decode a token and its embedded statements.
///
/// # Errors
///
/// Returns `FederationError::NotFound` if the tree contains
/// `metadata_statement_uris`; use [`unpack_statement`] for those.
pub fn ground(token: &SignedStatement) -> Result<GroundedStatement> {
    resolve(token, None, 0)
}

fn resolve(
    token: &SignedStatement,
    store: Option<&MetadataStore>,
    depth: usize,
) -> Result<GroundedStatement> {
    if depth >= MAX_CHAIN_DEPTH {
        return Err(FederationError::Validation(format!(
            "statement chain nested deeper than {MAX_CHAIN_DEPTH}"
        )));
    }

    let mut unverified = token.unfurl()?;
    let embedded = unverified.metadata_statements()?;
    let uris = unverified.metadata_statement_uris()?;
    unverified.remove(METADATA_STATEMENTS);
    unverified.remove(METADATA_STATEMENT_URIS);

    let mut nested = IndexMap::new();
    for (key, child) in &embedded {
        nested.insert(key.clone(), resolve(child, store, depth + 1)?);
    }
    for (key, uri) in &uris {
        if nested.contains_key(key) {
            return Err(FederationError::Validation(format!(
                "'{key}' is both embedded and referenced"
            )));
        }
        let Some(store) = store else {
            return Err(FederationError::NotFound(format!(
                "{uri} (no statement store to resolve it)"
            )));
        };
        let child = store.get(&reference_key(uri)?)?;
        log::debug!("resolved {key} -> {uri}");
        nested.insert(key.clone(), resolve(&child, Some(store), depth + 1)?);
    }

    Ok(GroundedStatement {
        token: token.clone(),
        unverified,
        nested,
    })
}
