//! Federation entity — the single entry point for issuing and evaluating
//! statements.

use indexmap::IndexMap;

use crate::chain::builder::{compose_statement, ChainMode};
use crate::chain::resolver::{ground, unpack, GroundedStatement};
use crate::chain::verify::evaluate_trusted;
use crate::crypto::KeyStore;
use crate::error::Result;
use crate::policy::{ClaimPolicy, FederationClaims};
use crate::statement::{Context, MetadataStatement, SignedStatement};
use crate::storage::{KeyBundle, MetadataStore};

use super::signing::{JwtArgs, Signer, SigningService};

/// An entity taking part in one or more federations.
pub struct FederationEntity {
    id: String,
    keys: KeyStore,
    signer: Signer,
    fo_bundle: KeyBundle,
    policy: ClaimPolicy,
}

impl FederationEntity {
    pub fn new(
        id: impl Into<String>,
        keys: KeyStore,
        signer: Signer,
        fo_bundle: KeyBundle,
        policy: ClaimPolicy,
    ) -> Self {
        Self {
            id: id.into(),
            keys,
            signer,
            fo_bundle,
            policy,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn signer_mut(&mut self) -> &mut Signer {
        &mut self.signer
    }

    pub fn fo_bundle(&self) -> &KeyBundle {
        &self.fo_bundle
    }

    pub fn policy(&self) -> &ClaimPolicy {
        &self.policy
    }

    /// Ids of the federation operators this entity trusts.
    pub fn trusted_operators(&self) -> Vec<String> {
        self.fo_bundle.ids()
    }

    /// Put this entity's public signing keys into `statement`.
    pub fn add_signing_keys(&self, statement: &mut MetadataStatement) {
        statement.set_signing_keys(&self.keys.export_public_jwks());
    }

    /// Issue a statement under federation `fo` for `context`.
    ///
    /// The statement filed for `fo` is embedded, this entity's keys are
    /// injected and the audience is restricted to this entity.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::UnknownFederationOperator` if `fo` is not
    /// trusted, or `FederationError::NotFound` if no statement is filed for
    /// it.
    pub fn issue_statement(
        &self,
        request: &MetadataStatement,
        context: Context,
        fo: &str,
    ) -> Result<SignedStatement> {
        self.fo_bundle.get(fo)?;
        let filed = self.signer.metadata_statement(context, fo)?;

        let mut prior = IndexMap::new();
        prior.insert(fo.to_string(), filed);
        let statement = compose_statement(
            request.claims(),
            &self.keys.export_public_jwks(),
            &prior,
            &serde_json::Map::new(),
            &mut ChainMode::Embed,
        )?;

        log::debug!("{} issuing {context} statement under {fo}", self.id);
        self.signer
            .service()
            .sign(&statement, &JwtArgs::audience(self.id.as_str()))
    }

    /// Verify a statement and return the effective claims of every
    /// federation it belongs to that this entity trusts.
    ///
    /// Branches rooted in untrusted federation operators are dropped
    /// before verification.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::UnknownFederationOperator` if no branch is
    /// rooted in a trusted operator, and any verification or
    /// `PolicyEscalation` error from the remaining tree.
    pub fn evaluate(&self, token: &SignedStatement) -> Result<Vec<FederationClaims>> {
        self.evaluate_grounded(&ground(token)?)
    }

    /// Like [`evaluate`](Self::evaluate), resolving `reference` through
    /// `store`.
    pub fn evaluate_reference(
        &self,
        reference: &str,
        store: &MetadataStore,
    ) -> Result<Vec<FederationClaims>> {
        self.evaluate_grounded(&unpack(reference, store)?)
    }

    fn evaluate_grounded(&self, grounded: &GroundedStatement) -> Result<Vec<FederationClaims>> {
        evaluate_trusted(grounded, &self.fo_bundle, &self.policy)
    }
}
