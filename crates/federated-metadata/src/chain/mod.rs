//! Trust chains — building, resolving, verifying and flattening.
//!
//! - [`descriptor`] — caller input: root-to-leaf hops, with fan-out
//! - [`builder`] — signs a descriptor in embed or indirect mode
//! - [`resolver`] — decodes a chain into an explicit tree (no verification)
//! - [`verify`] — verifies a decoded tree and narrows claims along it

pub mod builder;
pub mod descriptor;
pub mod resolver;
pub mod verify;

pub use builder::{
    build_chain, build_chains, compose_statement, make_statement, reference_uri, ChainMode,
    StatementRef,
};
pub use descriptor::{ChainDescriptor, ChainLevel, HopDescriptor};
pub use resolver::{ground, unpack, unpack_statement, GroundedStatement, MAX_CHAIN_DEPTH};
pub use verify::{
    evaluate, evaluate_trusted, flatten, keys_from_statements, trusted_subtree, verify_grounded,
    VerifiedStatement,
};
