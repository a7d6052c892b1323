//! Persistence for key bundles and statements.
//!
//! Everything is stored one file per entry, filenames being the
//! form-urlencoded entry key:
//!
//! ```text
//! {home}/
//! ├── fo_jwks/                 — key bundle, one JWKS per federation operator
//! ├── ms/{signer}/{context}/   — statements filed for a signer, per FO
//! └── mds/                     — content-addressed statement store
//! ```

pub mod file_system;
pub mod key_bundle;
pub mod metadata_store;

pub use file_system::{quote_plus, unquote_plus, FileSystem};
pub use key_bundle::{make_fs_key_bundle, make_key_bundle, FsKeyBundle, KeyBundle, KeyExport};
pub use metadata_store::MetadataStore;
