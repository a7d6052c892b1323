//! Federated metadata statements — nested, signed trust chains between
//! federation operators.
//!
//! Provides the statement model and its invariants, the `is_lesser`
//! policy-subsumption comparator, chain building in embed and indirect
//! mode, chain resolution, verification and flattening, key bundles and a
//! content-addressed statement store.

pub mod chain;
pub mod crypto;
pub mod error;
pub mod federation;
pub mod policy;
pub mod statement;
pub mod storage;
pub mod time;

// Re-export primary types
pub use error::{FederationError, Result};
pub use statement::{Context, MetadataStatement, SignedStatement};

// Re-export chain types
pub use chain::{
    build_chain, evaluate, evaluate_trusted, flatten, ground, unpack, verify_grounded, ChainDescriptor, ChainLevel,
    ChainMode, GroundedStatement, HopDescriptor, StatementRef, VerifiedStatement,
};

// Re-export policy types
pub use policy::{is_lesser, ClaimPolicy, FederationClaims};

// Re-export federation types
pub use federation::{
    FederationEntity, InternalSigningService, JwtArgs, Operator, Operators, Signer,
    SigningService,
};

// Re-export storage types
pub use crypto::{Jwk, Jwks, KeyStore};
pub use storage::{FsKeyBundle, KeyBundle, KeyExport, MetadataStore};
