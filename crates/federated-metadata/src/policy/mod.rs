//! Policy subsumption.
//!
//! - [`compare`] — the recursive `is_lesser` comparator
//! - [`claims`] — explicit claim-filtering configuration and per-federation
//!   narrowing of claims along a chain

pub mod claims;
pub mod compare;

pub use claims::{ClaimPolicy, FederationClaims};
pub use compare::is_lesser;
