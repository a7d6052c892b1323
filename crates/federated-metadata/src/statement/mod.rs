//! Metadata statements and their signed form.

pub mod context;
pub mod metadata;
pub mod signed;

pub use context::Context;
pub use metadata::MetadataStatement;
pub use signed::SignedStatement;
