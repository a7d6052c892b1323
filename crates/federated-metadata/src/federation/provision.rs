//! Provisioning — pre-signing the statements signers hand out, and
//! assembling federation entities from what is on disk.
//!
//! Signer definitions map each signer to, per context, the chain that
//! produces its statement under each federation operator:
//!
//! ```json
//! {
//!   "https://sunet.se": {
//!     "registration": {
//!       "https://swamid.sunet.se": [
//!         {"request": {}, "requester": "https://sunet.se", "signer": "https://swamid.sunet.se"}
//!       ]
//!     }
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::chain::builder::{build_chain, ChainMode};
use crate::chain::descriptor::ChainDescriptor;
use crate::crypto::KeyStore;
use crate::error::{FederationError, Result};
use crate::policy::ClaimPolicy;
use crate::statement::Context;
use crate::storage::{quote_plus, FsKeyBundle, KeyExport};

use super::entity::FederationEntity;
use super::operator::Operators;
use super::signing::{InternalSigningService, Signer};

/// Signer id → context → federation operator id → chain.
pub type SignerDefinitions = IndexMap<String, IndexMap<Context, IndexMap<String, ChainDescriptor>>>;

/// Statement directory of one signer under `ms_root`.
pub fn signer_dir(ms_root: &Path, signer: &str) -> PathBuf {
    ms_root.join(quote_plus(signer))
}

/// Build every defined chain and file the result with its signer.
///
/// Each chain must produce exactly one statement; it is filed under the
/// operator id it is defined for.
///
/// # Errors
///
/// Returns `FederationError::UnknownOperator` if a signer or a hop names an
/// operator not in `operators`, or `FederationError::Validation` if a
/// chain does not produce exactly one statement.
pub fn setup(
    ms_root: &Path,
    operators: &Operators,
    definitions: &SignerDefinitions,
) -> Result<IndexMap<String, Signer>> {
    let mut signers = IndexMap::new();

    for (signer_id, contexts) in definitions {
        let operator = operators.get(signer_id)?;
        let service = InternalSigningService::new(signer_id.as_str(), operator.keys().clone());
        let mut signer = Signer::new(Box::new(service), signer_dir(ms_root, signer_id))?;

        for (context, chains) in contexts {
            for (fo, path) in chains {
                let built = build_chain(path, operators, &mut ChainMode::Embed)?;
                let mut tokens = built.into_values().filter_map(|r| r.token().cloned());
                let (Some(token), None) = (tokens.next(), tokens.next()) else {
                    return Err(FederationError::Validation(format!(
                        "chain for {signer_id} under {fo} ({context}) must produce one statement"
                    )));
                };
                signer.store(*context, fo, &token)?;
                log::debug!("filed {context} statement for {signer_id} under {fo}");
            }
        }

        signers.insert(signer_id.clone(), signer);
    }

    Ok(signers)
}

/// Assemble a federation entity from disk.
///
/// The entity's statements are read from its directory under `ms_root`,
/// and it trusts the operators of `trusted` found in the public key
/// bundle at `fo_bundle_dir` (all of them when `trusted` is empty).
///
/// # Errors
///
/// Returns `FederationError::UnknownFederationOperator` if a trusted
/// operator has no keys in the bundle, and any error from opening the
/// directories.
pub fn create_federation_entity<S: AsRef<str>>(
    id: &str,
    keys: KeyStore,
    ms_root: &Path,
    fo_bundle_dir: &Path,
    trusted: &[S],
    policy: ClaimPolicy,
) -> Result<FederationEntity> {
    let bundle = FsKeyBundle::open(fo_bundle_dir, KeyExport::Public)?.into_bundle();
    let fo_bundle = if trusted.is_empty() {
        bundle
    } else {
        bundle.subset(trusted)?
    };

    let service = InternalSigningService::new(id, keys.clone());
    let signer = Signer::new(Box::new(service), signer_dir(ms_root, id))?;
    Ok(FederationEntity::new(id, keys, signer, fo_bundle, policy))
}
