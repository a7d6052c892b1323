//! Key bundles — federation operator id → key store.
//!
//! A [`KeyBundle`] is the set of federation operators an entity trusts,
//! with their keys. [`FsKeyBundle`] persists one JWKS file per operator:
//!
//! ```text
//! {dir}/
//! └── {quote_plus(fo)}     — { "keys": [ ... ] }
//! ```

use std::path::PathBuf;

use indexmap::IndexMap;
use serde_json::Value;

use crate::crypto::{Jwks, KeyStore};
use crate::error::{FederationError, Result};
use crate::federation::signing::{JwtArgs, SigningService};
use crate::statement::{MetadataStatement, SignedStatement};

use super::file_system::FileSystem;

/// Claim carrying the exported bundle in a signed bundle.
pub const BUNDLE_CLAIM: &str = "bundle";

/// In-memory mapping of federation operator ids to key stores.
#[derive(Debug, Clone, Default)]
pub struct KeyBundle {
    bundle: IndexMap<String, KeyStore>,
}

impl KeyBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key store of a federation operator.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::UnknownFederationOperator` if `fo` is not
    /// in the bundle.
    pub fn get(&self, fo: &str) -> Result<&KeyStore> {
        self.bundle
            .get(fo)
            .ok_or_else(|| FederationError::UnknownFederationOperator(fo.to_string()))
    }

    /// Insert or overwrite the keys of `fo`.
    pub fn set(&mut self, fo: impl Into<String>, keys: KeyStore) {
        self.bundle.insert(fo.into(), keys);
    }

    pub fn remove(&mut self, fo: &str) -> Option<KeyStore> {
        self.bundle.shift_remove(fo)
    }

    pub fn contains(&self, fo: &str) -> bool {
        self.bundle.contains_key(fo)
    }

    /// Ids of all federation operators in the bundle.
    pub fn ids(&self) -> Vec<String> {
        self.bundle.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyStore)> {
        self.bundle.iter()
    }

    pub fn len(&self) -> usize {
        self.bundle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundle.is_empty()
    }

    /// A bundle holding only the listed operators.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::UnknownFederationOperator` for any id not
    /// in this bundle.
    pub fn subset<S: AsRef<str>>(&self, fos: &[S]) -> Result<KeyBundle> {
        let mut sub = KeyBundle::new();
        for fo in fos {
            let fo = fo.as_ref();
            sub.set(fo, self.get(fo)?.clone());
        }
        Ok(sub)
    }

    /// Public keys of every operator.
    pub fn export_public(&self) -> IndexMap<String, Jwks> {
        self.bundle
            .iter()
            .map(|(fo, keys)| (fo.clone(), keys.export_public_jwks()))
            .collect()
    }

    /// Every key, including private halves where held.
    pub fn export_private(&self) -> IndexMap<String, Jwks> {
        self.bundle
            .iter()
            .map(|(fo, keys)| (fo.clone(), keys.export_private_jwks()))
            .collect()
    }

    /// Import exported key sets. Nothing is imported if any set is malformed.
    pub fn import(&mut self, exported: &IndexMap<String, Jwks>) -> Result<()> {
        let decoded = exported
            .iter()
            .map(|(fo, jwks)| Ok((fo.clone(), KeyStore::from_jwks(jwks, fo.as_str())?)))
            .collect::<Result<Vec<_>>>()?;
        for (fo, keys) in decoded {
            self.set(fo, keys);
        }
        Ok(())
    }

    /// Sign the public export of this bundle.
    pub fn create_signed_bundle(&self, service: &dyn SigningService) -> Result<SignedStatement> {
        let mut statement = MetadataStatement::new();
        statement.insert(BUNDLE_CLAIM, serde_json::to_value(self.export_public())?);
        service.sign(&statement, &JwtArgs::default())
    }

    /// Verify a signed bundle with `keys` and import its key sets.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::SignatureInvalid` if `keys` did not sign
    /// the bundle, `FederationError::Expired` if its `exp` has passed, or
    /// `FederationError::Validation` if it has no bundle claim.
    pub fn upload_signed_bundle(&mut self, token: &SignedStatement, keys: &KeyStore) -> Result<()> {
        let payload = token.verify_signature(keys)?;
        payload.check_expiry(crate::time::now_secs())?;
        let exported = payload.get(BUNDLE_CLAIM).cloned().ok_or_else(|| {
            FederationError::Validation(format!("signed bundle has no \"{BUNDLE_CLAIM}\" claim"))
        })?;
        let exported: IndexMap<String, Jwks> = match exported {
            Value::Object(_) => serde_json::from_value(exported)
                .map_err(|e| FederationError::InvalidKey(format!("malformed bundle: {e}")))?,
            _ => {
                return Err(FederationError::Validation(format!(
                    "\"{BUNDLE_CLAIM}\" must be a mapping"
                )))
            }
        };
        self.import(&exported)
    }
}

/// Which half of each key is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExport {
    Public,
    Private,
}

/// A key bundle persisted one JWKS file per federation operator.
pub struct FsKeyBundle {
    fs: FileSystem,
    bundle: KeyBundle,
    export: KeyExport,
}

impl FsKeyBundle {
    /// Open (creating if needed) a bundle directory and load every entry.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::InvalidFileFormat` if an entry is not a
    /// JWKS, `FederationError::InvalidKey` if a key does not decode, or
    /// `FederationError::Io` for filesystem errors.
    pub fn open(dir: impl Into<PathBuf>, export: KeyExport) -> Result<Self> {
        let fs = FileSystem::open(dir)?;
        let mut bundle = KeyBundle::new();
        for (fo, content) in fs.items() {
            let jwks: Jwks = serde_json::from_str(content).map_err(|e| {
                FederationError::InvalidFileFormat(format!("key file for {fo}: {e}"))
            })?;
            bundle.set(fo.clone(), KeyStore::from_jwks(&jwks, fo.as_str())?);
        }
        Ok(Self { fs, bundle, export })
    }

    pub fn get(&self, fo: &str) -> Result<&KeyStore> {
        self.bundle.get(fo)
    }

    /// Insert or overwrite the keys of `fo`, writing them through to disk.
    pub fn set(&mut self, fo: &str, keys: KeyStore) -> Result<()> {
        let jwks = match self.export {
            KeyExport::Public => keys.export_public_jwks(),
            KeyExport::Private => keys.export_private_jwks(),
        };
        self.fs.set(fo, serde_json::to_string_pretty(&jwks)?)?;
        self.bundle.set(fo, keys);
        Ok(())
    }

    pub fn contains(&self, fo: &str) -> bool {
        self.bundle.contains(fo)
    }

    pub fn ids(&self) -> Vec<String> {
        self.bundle.ids()
    }

    pub fn bundle(&self) -> &KeyBundle {
        &self.bundle
    }

    pub fn into_bundle(self) -> KeyBundle {
        self.bundle
    }
}

/// Build an in-memory bundle with fresh keys for each federation operator.
pub fn make_key_bundle<S: AsRef<str>>(fo_ids: &[S], keys_per_fo: usize) -> KeyBundle {
    let mut bundle = KeyBundle::new();
    for fo in fo_ids {
        let fo = fo.as_ref();
        bundle.set(fo, KeyStore::generate(fo, keys_per_fo));
    }
    bundle
}

/// Open a persisted bundle (private keys on disk), generating keys for any
/// listed federation operator that has none yet.
pub fn make_fs_key_bundle<S: AsRef<str>>(
    dir: impl Into<PathBuf>,
    fo_ids: &[S],
    keys_per_fo: usize,
) -> Result<FsKeyBundle> {
    let mut bundle = FsKeyBundle::open(dir, KeyExport::Private)?;
    for fo in fo_ids {
        let fo = fo.as_ref();
        if !bundle.contains(fo) {
            log::debug!("generating {keys_per_fo} key(s) for {fo}");
            bundle.set(fo, KeyStore::generate(fo, keys_per_fo))?;
        }
    }
    Ok(bundle)
}
