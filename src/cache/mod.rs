//! Storage for the intermediate artifacts of a run.
//!
//! Scanning an experiment tree and reading every result file is slow, so the
//! discovered path list and the loaded results are memoized between runs.
//! Artifacts are never invalidated automatically: a stale artifact is used as
//! is until it is invalidated explicitly (`--refresh`) or deleted by hand.

use crate::errors::CacheError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

/// Key/value store holding serialized artifacts.
pub trait Cache {
    /// Return the stored artifact, or `None` if it has never been stored.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// Store an artifact, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> Result<(), CacheError>;
    /// Forget an artifact. Forgetting a missing artifact is not an error.
    fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

/// Load and deserialize a JSON artifact.
pub fn get_json<T: DeserializeOwned>(
    cache: &dyn Cache,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| CacheError::Json {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Serialize and store a JSON artifact.
pub fn put_json<T: Serialize + ?Sized>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value).map_err(|source| CacheError::Json {
        key: key.to_string(),
        source,
    })?;
    cache.put(key, &raw)
}

/// Artifacts stored as files in a directory, one file per key.
#[derive(Debug, Clone)]
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn io_error(path: &Path, source: io::Error) -> CacheError {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Cache for FsCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => {
                debug!("Cache hit: {}", path.display());
                Ok(Some(content))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Cache miss: {}", path.display());
                Ok(None)
            }
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;

        // Written next to the target and renamed so readers never see a partial file
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| Self::io_error(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| Self::io_error(&path, e.error))?;

        debug!("Cache stored: {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Cache invalidated: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}

/// Artifacts held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
