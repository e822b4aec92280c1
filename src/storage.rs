//! Persistent key/value storage for todos
//!
//! The core only depends on the [`KeyValueStore`] contract: string keys
//! mapped to serialized JSON strings. Two backends ship with the crate:
//!
//! - [`FileStore`] keeps one file per key inside a data directory
//! - [`MemoryStore`] keeps values in a map (tests and embedding)
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   config.toml           # Optional configuration
//!   .lock                 # Session lock (fs2/flock)
//!   todos.json            # Canonical todo list snapshot
//!   celebration.json      # Celebration monitor state (CLI)
//!   todos.corrupt.json    # Last unparsable snapshot, if any
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock};

/// Name of the session lock file inside the data directory
pub const LOCK_FILE: &str = ".lock";

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Asynchronous-storage contract reduced to its essentials.
///
/// `get` returns `Ok(None)` when the key has never been written.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Validate a storage key: non-empty, `[A-Za-z0-9_.-]` only
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("storage key cannot be empty".to_string()));
    }
    if key.starts_with('.') {
        return Err(Error::InvalidArgument(format!(
            "storage key '{key}' cannot start with '.'"
        )));
    }
    if !key
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
    {
        return Err(Error::InvalidArgument(format!(
            "storage key '{key}' may only contain letters, digits, '_', '-' and '.'"
        )));
    }
    Ok(())
}

// =========================================================================
// File-backed store
// =========================================================================

/// File-backed store rooted at a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path to the data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`
    pub fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Path to the session lock file
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Path to the optional configuration file
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Create the data directory if it does not exist
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Take the exclusive session lock for this data directory
    ///
    /// Hold the guard across a whole load -> mutate -> persist cycle so
    /// another process cannot persist a list derived from a stale snapshot.
    pub fn session_lock(&self, timeout_ms: u64) -> Result<FileLock> {
        FileLock::acquire(self.lock_file(), timeout_ms)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::StorageRead {
                key: key.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.key_path(key);
        lock::write_atomic(&path, value.as_bytes()).map_err(|err| Error::StorageWrite {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
        tracing::debug!(key, path = %path.display(), bytes = value.len(), "stored value");
        Ok(())
    }
}

// =========================================================================
// In-memory store
// =========================================================================

/// In-memory store with switchable failure injection
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a write
    pub fn with_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Make every subsequent `get` fail
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Make every subsequent `set` fail
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Raw stored value, bypassing failure injection
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(Error::StorageRead {
                key: key.to_string(),
                reason: "injected read failure".to_string(),
            });
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            return Err(Error::StorageWrite {
                key: key.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}
