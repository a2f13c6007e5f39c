//! Object store - where raw extracts, transformed CSVs and store snapshots live.
//!
//! Objects are opaque bytes addressed by `(container, key)`. The pipeline
//! only touches the store at its boundaries: fetching the input, publishing
//! the transformed CSV, fetching and publishing the database snapshot.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{StorageError, StorageResult};

/// Directory where objects are stored (relative to current dir)
pub const DEFAULT_OBJECT_ROOT: &str = ".salesdb/objects";

static OBJECT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("object name pattern is valid"));

/// Confirmation returned by [`ObjectStore::put`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutReceipt {
    pub container: String,
    pub key: String,
    pub size: usize,
    /// Opaque version tag, new on every put.
    pub etag: String,
}

impl PutReceipt {
    fn new(container: &str, key: &str, size: usize) -> Self {
        Self {
            container: container.to_string(),
            key: key.to_string(),
            size,
            etag: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

/// Byte storage keyed by `(container, key)`.
pub trait ObjectStore: Send + Sync {
    fn get(&self, container: &str, key: &str) -> StorageResult<Vec<u8>>;

    fn put(&self, container: &str, key: &str, bytes: &[u8]) -> StorageResult<PutReceipt>;

    /// `get`, with a missing object mapped to `None`.
    fn get_optional(&self, container: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        match self.get(container, key) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Reject anything that is not a single plain path component.
pub fn validate_name(name: &str) -> StorageResult<()> {
    if OBJECT_NAME.is_match(name) && name != "." && name != ".." {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

fn not_found(container: &str, key: &str) -> StorageError {
    StorageError::NotFound {
        container: container.to_string(),
        key: key.to_string(),
    }
}

// =============================================================================
// Filesystem store
// =============================================================================

/// Containers are directories under a root, objects are files.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at the default directory
    pub fn new() -> Self {
        Self::with_root(DEFAULT_OBJECT_ROOT)
    }

    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: PathBuf::from(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, container: &str, key: &str) -> StorageResult<PathBuf> {
        validate_name(container)?;
        validate_name(key)?;
        Ok(self.root.join(container).join(key))
    }
}

impl Default for FsObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, container: &str, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(container, key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(not_found(container, key)),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, container: &str, key: &str, bytes: &[u8]) -> StorageResult<PutReceipt> {
        let path = self.object_path(container, key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        // Write-then-rename so readers never see a half-written object.
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;

        Ok(PutReceipt::new(container, key, bytes.len()))
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, container: &str, key: &str) -> StorageResult<Vec<u8>> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "object map poisoned"))?;
        objects
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| not_found(container, key))
    }

    fn put(&self, container: &str, key: &str, bytes: &[u8]) -> StorageResult<PutReceipt> {
        validate_name(container)?;
        validate_name(key)?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "object map poisoned"))?;
        objects.insert((container.to_string(), key.to_string()), bytes.to_vec());
        Ok(PutReceipt::new(container, key, bytes.len()))
    }
}
