//! Content-addressed store for signed metadata statements.
//!
//! The key of an entry is the SHA-256 (lowercase hex) of the token's bytes,
//! so adding the same token twice yields the same key and a single file.
//! References to stored statements are `{base_uri}/{key}`.

use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::error::{FederationError, Result};
use crate::statement::SignedStatement;

use super::file_system::FileSystem;

/// Hash-keyed persistence for indirected statements.
pub struct MetadataStore {
    fs: FileSystem,
}

impl MetadataStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            fs: FileSystem::open(dir)?,
        })
    }

    /// The content key for `value`.
    pub fn hash(value: &[u8]) -> String {
        hex::encode(Sha256::digest(value))
    }

    /// Store a signed statement and return its key.
    ///
    /// Idempotent: identical bytes map to the same key and are written once.
    pub fn add(&mut self, statement: &SignedStatement) -> Result<String> {
        let key = Self::hash(statement.as_str().as_bytes());
        if self.fs.contains(&key) {
            log::debug!("metadata statement {key} already stored");
            return Ok(key);
        }
        self.fs.set(&key, statement.as_str())?;
        Ok(key)
    }

    /// Fetch a signed statement by key.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::NotFound` if no entry has that key.
    pub fn get(&self, key: &str) -> Result<SignedStatement> {
        self.fs
            .get(key)
            .map(SignedStatement::new)
            .ok_or_else(|| FederationError::NotFound(format!("metadata statement {key}")))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fs.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fs.keys()
    }

    pub fn len(&self) -> usize {
        self.fs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fs.is_empty()
    }
}
