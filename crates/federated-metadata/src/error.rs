//! Error types for federated metadata statements.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.

/// Errors covering statement validation, chain construction and verification.
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    #[error("Invalid metadata statement: {0}")]
    Validation(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Unknown federation operator: {0}")]
    UnknownFederationOperator(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Signature verification failed for {issuer}: {reason}")]
    SignatureInvalid { issuer: String, reason: String },

    #[error("Statement from {issuer} expired at {exp}")]
    Expired { issuer: String, exp: i64 },

    #[error("Policy escalation in federation {fo}: {signer} broadens claim '{claim}'")]
    PolicyEscalation {
        fo: String,
        claim: String,
        signer: String,
    },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FederationError {
    pub(crate) fn signature(issuer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            issuer: issuer.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for FederationError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, FederationError>;
