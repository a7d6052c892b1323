//! Directory-backed key/value map.
//!
//! Each entry is one file whose name is the form-urlencoded key
//! (`https://fo.example.org` → `https%3A%2F%2Ffo.example.org`) and whose
//! content is the value:
//!
//! ```text
//! {dir}/
//! ├── https%3A%2F%2Fswamid.sunet.se
//! ├── https%3A%2F%2Fedugain.org
//! └── 5f0c…e9   (content hashes need no escaping)
//! ```
//!
//! Entries are cached in memory on open. The store is safe for
//! single-process use; concurrent writers are not coordinated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use url::form_urlencoded;

use crate::error::{FederationError, Result};

/// Encode a key as a filename.
pub fn quote_plus(key: &str) -> String {
    form_urlencoded::byte_serialize(key.as_bytes()).collect()
}

/// Decode a filename produced by [`quote_plus`].
pub fn unquote_plus(name: &str) -> String {
    form_urlencoded::parse(name.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

/// A directory of entries, one file per key.
pub struct FileSystem {
    dir: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileSystem {
    /// Open (creating if needed) the directory `dir` and load its entries.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::Io` if the directory cannot be created or
    /// read, or `FederationError::InvalidFileFormat` for an entry that is
    /// not UTF-8.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let mut fs = Self {
            dir,
            entries: BTreeMap::new(),
        };
        fs.sync()?;
        Ok(fs)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reload every entry from disk, picking up files written elsewhere.
    ///
    /// Hidden files (editor swap files, `.DS_Store`) are not entries.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::InvalidFileFormat` naming the file if an
    /// entry is not UTF-8, or `FederationError::Io` if the directory cannot
    /// be read.
    pub fn sync(&mut self) -> Result<()> {
        let mut entries = BTreeMap::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let value = String::from_utf8(std::fs::read(&path)?).map_err(|_| {
                FederationError::InvalidFileFormat(format!(
                    "{} is not a UTF-8 entry",
                    path.display()
                ))
            })?;
            entries.insert(unquote_plus(&name), value);
        }
        self.entries = entries;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Write an entry, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::Validation` for keys that cannot name a
    /// file, or `FederationError::Io` for filesystem errors.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let path = self.entry_path(key)?;
        std::fs::write(&path, value.as_bytes())?;
        log::debug!("stored {} ({} bytes)", path.display(), value.len());
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Delete an entry. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let path = self.entry_path(key)?;
        if self.entries.remove(key).is_none() {
            return Ok(false);
        }
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(true)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn items(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        let name = quote_plus(key);
        if name.is_empty() || name.starts_with('.') {
            return Err(FederationError::Validation(format!(
                "'{key}' cannot be used as a store key"
            )));
        }
        Ok(self.dir.join(name))
    }
}
