//! Federation participants.
//!
//! - [`signing`] — the signing-service seam and per-context statement filing
//! - [`operator`] — operators that sign statements in a chain
//! - [`entity`] — the facade an entity issues and evaluates statements through
//! - [`provision`] — pre-signing statements and assembling entities from disk

pub mod entity;
pub mod operator;
pub mod provision;
pub mod signing;

pub use entity::FederationEntity;
pub use operator::{Operator, Operators};
pub use provision::{create_federation_entity, setup, signer_dir, SignerDefinitions};
pub use signing::{InternalSigningService, JwtArgs, Signer, SigningService};
