//! Key-value storage backends.
//!
//! The registry persists everything as a handful of string entries under a
//! namespace. This module provides the trait for such a store and two
//! implementations:
//!
//! - [`FileStore`] - one file per key inside a namespace directory
//! - [`MemoryStore`] - in-memory map (tests, embedding)

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Storage error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read an entry.
    #[error("failed to read '{key}' from {path:?}: {source}")]
    Read {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an entry.
    #[error("failed to write '{key}' to {path:?}: {source}")]
    Write {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove an entry.
    #[error("failed to remove '{key}' at {path:?}: {source}")]
    Remove {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend cannot be used at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value storage backend trait.
///
/// Each call on a single key is atomic from the caller's point of view:
/// a reader sees either the previous value or the new one, never a mix.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// A shared store handle.
pub type BoxKeyValueStore = Arc<dyn KeyValueStore>;

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
