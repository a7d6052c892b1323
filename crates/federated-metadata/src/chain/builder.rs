//! Chain builder — signs a descriptor path root-to-leaf.
//!
//! Each hop's statement carries the requester's public keys and the
//! statements produced by the level above it. In embed mode those are
//! placed under `metadata_statements`; in indirect mode they are written to
//! a [`MetadataStore`] and referenced from `metadata_statement_uris` as
//! `{base_uri}/{content key}`. Either way the mapping is keyed by the id of
//! the operator that signed the attached statement.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::crypto::Jwks;
use crate::error::Result;
use crate::federation::operator::Operators;
use crate::federation::signing::JwtArgs;
use crate::statement::{MetadataStatement, SignedStatement};
use crate::storage::MetadataStore;

use super::descriptor::{ChainDescriptor, HopDescriptor};

/// How statements from the level above are attached.
pub enum ChainMode<'a> {
    /// Inline under `metadata_statements`.
    Embed,
    /// Stored and referenced under `metadata_statement_uris`.
    Indirect {
        store: &'a mut MetadataStore,
        base_uri: &'a str,
    },
}

impl ChainMode<'_> {
    pub fn is_indirect(&self) -> bool {
        matches!(self, ChainMode::Indirect { .. })
    }
}

/// A built statement: the token itself, or a reference into a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementRef {
    Embedded(SignedStatement),
    Uri(String),
}

impl StatementRef {
    /// The token or URI as text.
    pub fn as_str(&self) -> &str {
        match self {
            StatementRef::Embedded(token) => token.as_str(),
            StatementRef::Uri(uri) => uri.as_str(),
        }
    }

    pub fn token(&self) -> Option<&SignedStatement> {
        match self {
            StatementRef::Embedded(token) => Some(token),
            StatementRef::Uri(_) => None,
        }
    }
}

/// Reference URL for a stored statement.
pub fn reference_uri(base_uri: &str, key: &str) -> String {
    format!("{}/{key}", base_uri.trim_end_matches('/'))
}

/// Compose an unsigned hop statement.
///
/// The request claims get the requester's public keys, then the
/// statements of the level above (`prior`, keyed by their signer) are
/// attached according to `mode`, then `signer_add` is merged over the
/// result.
pub fn compose_statement(
    request: &Map<String, Value>,
    requester_keys: &Jwks,
    prior: &IndexMap<String, SignedStatement>,
    signer_add: &Map<String, Value>,
    mode: &mut ChainMode<'_>,
) -> Result<MetadataStatement> {
    let mut statement = MetadataStatement::from_claims(request.clone());
    statement.set_signing_keys(requester_keys);

    if !prior.is_empty() {
        match mode {
            ChainMode::Embed => statement.set_metadata_statements(prior),
            ChainMode::Indirect { store, base_uri } => {
                let mut uris = IndexMap::new();
                for (fo, token) in prior {
                    let key = store.add(token)?;
                    uris.insert(fo.clone(), reference_uri(base_uri, &key));
                }
                statement.set_metadata_statement_uris(&uris);
            }
        }
    }

    statement.update(signer_add);
    Ok(statement)
}

/// Build and sign the statement for one hop.
///
/// On the leaf hop the audience is restricted to the requester.
///
/// # Errors
///
/// Returns `FederationError::UnknownOperator` if the requester or signer is
/// not in `operators`.
pub fn make_statement(
    hop: &HopDescriptor,
    prior: &IndexMap<String, SignedStatement>,
    leaf: bool,
    operators: &Operators,
    mode: &mut ChainMode<'_>,
) -> Result<SignedStatement> {
    let requester = operators.get(&hop.requester)?;
    let signer = operators.get(&hop.signer)?;

    let statement = compose_statement(
        &hop.request,
        &requester.signing_keys_as_jwks(),
        prior,
        &hop.signer_add,
        mode,
    )?;

    let args = if leaf {
        JwtArgs::audience(hop.requester.as_str())
    } else {
        JwtArgs::default()
    };
    let token = signer.pack_metadata_statement(&statement, &args)?;
    log::debug!(
        "{} signed statement for {} ({} attached)",
        hop.signer,
        hop.requester,
        prior.len()
    );
    Ok(token)
}

/// Build a chain root-to-leaf and return the leaf level keyed by signer id.
///
/// In indirect mode the leaf statements are stored too and returned as
/// URIs. An empty path yields an empty result; an empty fan-out level
/// leaves nothing to attach to the level below it.
///
/// # Errors
///
/// Returns `FederationError::UnknownOperator` for any operator id in the
/// path that `operators` does not hold. Nothing is returned for a partly
/// built chain.
pub fn build_chain(
    path: &ChainDescriptor,
    operators: &Operators,
    mode: &mut ChainMode<'_>,
) -> Result<IndexMap<String, StatementRef>> {
    let mut prior: IndexMap<String, SignedStatement> = IndexMap::new();
    let last = path.len().saturating_sub(1);

    for (depth, level) in path.levels().iter().enumerate() {
        let mut signed = IndexMap::new();
        for hop in level.hops() {
            let token = make_statement(hop, &prior, depth == last, operators, mode)?;
            signed.insert(hop.signer.clone(), token);
        }
        if signed.is_empty() {
            log::debug!("level {depth} is an empty fan-out");
        }
        prior = signed;
    }

    let mut out = IndexMap::new();
    for (signer, token) in prior {
        let reference = match mode {
            ChainMode::Embed => StatementRef::Embedded(token),
            ChainMode::Indirect { store, base_uri } => {
                let key = store.add(&token)?;
                StatementRef::Uri(reference_uri(base_uri, &key))
            }
        };
        out.insert(signer, reference);
    }
    Ok(out)
}

/// Build several chains with the same operators and mode.
pub fn build_chains(
    descriptors: &[ChainDescriptor],
    operators: &Operators,
    mode: &mut ChainMode<'_>,
) -> Result<Vec<IndexMap<String, StatementRef>>> {
    descriptors
        .iter()
        .map(|path| build_chain(path, operators, mode))
        .collect()
}
