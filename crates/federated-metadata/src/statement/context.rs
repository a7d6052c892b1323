//! Contexts in which a metadata statement can be used.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FederationError;

/// Where a signed metadata statement is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    /// Client registration requests.
    Registration,
    /// Provider discovery responses.
    Discovery,
    /// Registration responses.
    Response,
}

impl Context {
    pub const ALL: [Context; 3] = [Context::Registration, Context::Discovery, Context::Response];

    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Discovery => "discovery",
            Self::Response => "response",
        }
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FederationError::Validation(format!("unknown context: {s}")))
    }
}
