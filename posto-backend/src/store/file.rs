//! File-based key-value store.
//!
//! Layout: `<data_dir>/<namespace>/<key>`, one plain-text file per key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{KeyValueStore, StoreError};

/// File-based key-value store.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the namespace directory under `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P, namespace: &str) -> Result<Self, StoreError> {
        let dir = data_dir.as_ref().join(namespace);

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                let msg = match e.kind() {
                    ErrorKind::PermissionDenied => {
                        format!("Permission denied: cannot create directory {:?}", dir)
                    }
                    _ => format!("Failed to create directory {:?}: {}", dir, e),
                };
                StoreError::Unavailable(msg)
            })?;
            info!("Created store directory: {:?}", dir);
        }

        Ok(Self { dir })
    }

    /// Namespace directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);

        match fs::read_to_string(&path) {
            // Empty file is treated as non-existent
            Ok(content) if content.is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                path,
                source,
            }),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            path: path.clone(),
            source,
        };

        // Write atomically (write to temp file, then rename)
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, value).map_err(write_err)?;
        fs::rename(&temp_path, &path).map_err(write_err)?;

        debug!(key, bytes = value.len(), "store entry written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "store entry removed");
                Ok(())
            }
            // Already gone, that's fine
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove {
                key: key.to_string(),
                path,
                source,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
