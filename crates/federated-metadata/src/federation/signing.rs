//! Signing services and signers.
//!
//! [`SigningService`] is the seam to whatever actually holds the private
//! keys. [`InternalSigningService`] signs in-process with a [`KeyStore`].
//! A [`Signer`] pairs a signing service with the statements its superiors
//! have issued about it, filed per context and per federation operator:
//!
//! ```text
//! {ms_dir}/
//! ├── registration/
//! │   └── {quote_plus(fo)}     — signed statement
//! ├── discovery/
//! └── response/
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use crate::crypto::{jws, KeyStore};
use crate::error::{FederationError, Result};
use crate::statement::metadata::{AUD, EXP, IAT, ISS};
use crate::statement::{Context, MetadataStatement, SignedStatement};
use crate::storage::FileSystem;

/// Extra JWT claims set at signing time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JwtArgs {
    /// Audience restriction; omitted when empty.
    pub aud: Vec<String>,
}

impl JwtArgs {
    /// Restrict the audience to a single party.
    pub fn audience(aud: impl Into<String>) -> Self {
        Self {
            aud: vec![aud.into()],
        }
    }
}

/// Signs metadata statements on behalf of one issuer.
pub trait SigningService {
    /// The identifier placed in `iss`.
    fn issuer(&self) -> &str;

    /// Sign `statement`, setting the envelope claims.
    fn sign(&self, statement: &MetadataStatement, args: &JwtArgs) -> Result<SignedStatement>;
}

/// In-process signing with a local key store.
#[derive(Debug, Clone)]
pub struct InternalSigningService {
    iss: String,
    keys: KeyStore,
    lifetime: Option<i64>,
}

impl InternalSigningService {
    pub fn new(iss: impl Into<String>, keys: KeyStore) -> Self {
        Self {
            iss: iss.into(),
            keys,
            lifetime: None,
        }
    }

    /// Add `exp = iat + secs` to every signed statement.
    pub fn with_lifetime(mut self, secs: i64) -> Self {
        self.lifetime = Some(secs);
        self
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }
}

impl SigningService for InternalSigningService {
    fn issuer(&self) -> &str {
        &self.iss
    }

    fn sign(&self, statement: &MetadataStatement, args: &JwtArgs) -> Result<SignedStatement> {
        let mut claims = statement.claims().clone();
        let now = crate::time::now_secs();
        claims.insert(ISS.to_string(), Value::from(self.iss.as_str()));
        claims.insert(IAT.to_string(), Value::from(now));
        if let Some(lifetime) = self.lifetime {
            claims.insert(EXP.to_string(), Value::from(now + lifetime));
        }
        if !args.aud.is_empty() {
            claims.insert(AUD.to_string(), Value::from(args.aud.clone()));
        }

        let (kid, key) = self.keys.signing_key()?;
        let token = jws::sign(&claims, kid, key)?;
        log::debug!("{} signed statement with key {kid}", self.iss);
        Ok(SignedStatement::new(token))
    }
}

/// A signing service plus the statements filed for it per context.
pub struct Signer {
    service: Box<dyn SigningService>,
    ms_dir: PathBuf,
    contexts: HashMap<Context, FileSystem>,
}

impl Signer {
    /// Create a signer whose statements live under `ms_dir`.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::Io` if a context directory cannot be
    /// created or read.
    pub fn new(service: Box<dyn SigningService>, ms_dir: impl Into<PathBuf>) -> Result<Self> {
        let ms_dir = ms_dir.into();
        let mut contexts = HashMap::new();
        for context in Context::ALL {
            contexts.insert(context, FileSystem::open(ms_dir.join(context.as_str()))?);
        }
        Ok(Self {
            service,
            ms_dir,
            contexts,
        })
    }

    pub fn issuer(&self) -> &str {
        self.service.issuer()
    }

    pub fn service(&self) -> &dyn SigningService {
        self.service.as_ref()
    }

    /// Swap the signing service, keeping the filed statements.
    pub fn set_service(&mut self, service: Box<dyn SigningService>) {
        self.service = service;
    }

    pub fn ms_dir(&self) -> &Path {
        &self.ms_dir
    }

    fn context(&self, context: Context) -> Result<&FileSystem> {
        self.contexts
            .get(&context)
            .ok_or_else(|| FederationError::NotFound(format!("context {context}")))
    }

    /// File a statement issued about this signer under `fo`.
    pub fn store(&mut self, context: Context, fo: &str, statement: &SignedStatement) -> Result<()> {
        let fs = self
            .contexts
            .get_mut(&context)
            .ok_or_else(|| FederationError::NotFound(format!("context {context}")))?;
        fs.set(fo, statement.as_str())
    }

    /// The statement filed under `fo` for `context`.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::NotFound` if nothing is filed.
    pub fn metadata_statement(&self, context: Context, fo: &str) -> Result<SignedStatement> {
        self.context(context)?
            .get(fo)
            .map(SignedStatement::new)
            .ok_or_else(|| {
                FederationError::NotFound(format!("no {context} statement for {fo}"))
            })
    }

    /// Every statement filed for `context`, keyed by federation operator.
    pub fn metadata_statements(&self, context: Context) -> Result<IndexMap<String, SignedStatement>> {
        Ok(self
            .context(context)?
            .items()
            .map(|(fo, token)| (fo.clone(), SignedStatement::new(token.as_str())))
            .collect())
    }

    /// Federation operators with a statement filed for `context`.
    pub fn federation_operators(&self, context: Context) -> Result<Vec<String>> {
        Ok(self.context(context)?.keys().cloned().collect())
    }

    /// Sign `request` with the statements filed for `context` embedded.
    ///
    /// With `fos` only those operators' statements are embedded, and each
    /// must be filed; otherwise every filed statement is.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::NotFound` if a listed operator has nothing
    /// filed.
    pub fn create_signed_metadata_statement(
        &self,
        request: &MetadataStatement,
        context: Context,
        fos: Option<&[String]>,
        args: &JwtArgs,
    ) -> Result<SignedStatement> {
        let nested = match fos {
            Some(fos) => fos
                .iter()
                .map(|fo| Ok((fo.clone(), self.metadata_statement(context, fo)?)))
                .collect::<Result<IndexMap<_, _>>>()?,
            None => self.metadata_statements(context)?,
        };

        let mut statement = request.clone();
        if !nested.is_empty() {
            statement.set_metadata_statements(&nested);
        }
        self.service.sign(&statement, args)
    }
}
