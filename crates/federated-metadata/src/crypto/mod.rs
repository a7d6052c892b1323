//! Cryptographic building blocks.
//!
//! This module provides:
//! - Ed25519 key pairs and key ids
//! - Ed25519 JSON Web Keys and key sets
//! - Per-issuer key stores
//! - Compact JWS signing, verification and unverified decoding

pub mod jwk;
pub mod jws;
pub mod key_store;
pub mod keys;

pub use jwk::{Jwk, Jwks};
pub use key_store::KeyStore;
pub use keys::Ed25519KeyPair;
