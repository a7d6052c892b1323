//! Chain descriptors — caller input describing the chain to build.
//!
//! A descriptor is an ordered path from the root-most hop to the leaf-most.
//! In JSON a level is either one hop object or an array of sibling hops:
//!
//! ```json
//! [
//!   { "request": {"scope": ["openid"]}, "requester": "https://org",
//!     "signer": "https://swamid", "signer_add": {} },
//!   [ { "request": {}, "requester": "https://rp", "signer": "https://org" },
//!     { "request": {}, "requester": "https://rp", "signer": "https://inc" } ]
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FederationError, Result};

/// One signing hop: `signer` vouches for `requester`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopDescriptor {
    /// Claims the requester proposes.
    #[serde(default)]
    pub request: Map<String, Value>,
    /// Whose public keys go into `signing_keys`.
    pub requester: String,
    /// Who signs the statement.
    pub signer: String,
    /// Claims the signer adds or overrides.
    #[serde(default)]
    pub signer_add: Map<String, Value>,
}

impl HopDescriptor {
    pub fn new(requester: impl Into<String>, signer: impl Into<String>) -> Self {
        Self {
            request: Map::new(),
            requester: requester.into(),
            signer: signer.into(),
            signer_add: Map::new(),
        }
    }

    pub fn with_request(mut self, request: Map<String, Value>) -> Self {
        self.request = request;
        self
    }

    pub fn with_signer_add(mut self, signer_add: Map<String, Value>) -> Self {
        self.signer_add = signer_add;
        self
    }
}

/// A level of the chain: one hop, or sibling hops that sign independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainLevel {
    // Arrays must not be read as a hop struct in sequence form.
    FanOut(Vec<HopDescriptor>),
    Single(HopDescriptor),
}

impl ChainLevel {
    pub fn hops(&self) -> &[HopDescriptor] {
        match self {
            ChainLevel::Single(hop) => std::slice::from_ref(hop),
            ChainLevel::FanOut(hops) => hops,
        }
    }
}

impl From<HopDescriptor> for ChainLevel {
    fn from(hop: HopDescriptor) -> Self {
        ChainLevel::Single(hop)
    }
}

impl From<Vec<HopDescriptor>> for ChainLevel {
    fn from(hops: Vec<HopDescriptor>) -> Self {
        ChainLevel::FanOut(hops)
    }
}

/// Root-to-leaf path of chain levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainDescriptor(pub Vec<ChainLevel>);

impl ChainDescriptor {
    pub fn new(levels: Vec<ChainLevel>) -> Self {
        Self(levels)
    }

    /// A linear chain with one hop per level.
    pub fn linear(hops: Vec<HopDescriptor>) -> Self {
        Self(hops.into_iter().map(ChainLevel::Single).collect())
    }

    pub fn levels(&self) -> &[ChainLevel] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a descriptor from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FederationError::InvalidFileFormat(format!("chain descriptor: {e}")))
    }
}
