//! Filter store adapters.
//!
//! [`JsonFileFilterStore`] is rooted in a capability-scoped state directory.
//! Each key maps to `<state_dir>/<key>.json` holding the camelCase filter
//! blob. Keys are restricted to ASCII alphanumerics, `_`, and `-` so a key can
//! never escape the directory.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;

use crate::domain::FilterCriteria;
use crate::domain::ports::{FilterStore, FilterStoreError};

/// Filter store persisting one JSON document per key.
#[derive(Debug)]
pub struct JsonFileFilterStore {
    root: PathBuf,
    dir: Dir,
}

impl JsonFileFilterStore {
    /// Open (creating if needed) the state directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterStoreError::Io`] when the directory cannot be created
    /// or opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FilterStoreError> {
        let root = path.as_ref().to_path_buf();
        Dir::create_ambient_dir_all(&root, ambient_authority())
            .map_err(|error| io_error(&root, &error))?;
        let dir = Dir::open_ambient_dir(&root, ambient_authority())
            .map_err(|error| io_error(&root, &error))?;
        Ok(Self { root, dir })
    }
}

#[async_trait]
impl FilterStore for JsonFileFilterStore {
    async fn save(&self, key: &str, filters: &FilterCriteria) -> Result<(), FilterStoreError> {
        let file_name = file_name_for(key)?;
        let blob = serde_json::to_vec(filters)
            .map_err(|error| FilterStoreError::encode(error.to_string()))?;
        self.dir
            .write(&file_name, blob)
            .map_err(|error| io_error(&self.root.join(&file_name), &error))?;
        debug!(key, path = %self.root.join(&file_name).display(), "persisted filters");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<FilterCriteria>, FilterStoreError> {
        let file_name = file_name_for(key)?;
        let blob = match self.dir.read_to_string(&file_name) {
            Ok(blob) => blob,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(&self.root.join(&file_name), &error)),
        };
        serde_json::from_str(&blob)
            .map(Some)
            .map_err(|error| FilterStoreError::decode(error.to_string()))
    }
}

/// In-process filter store holding encoded blobs, for embedders without a
/// writable directory.
#[derive(Debug, Default)]
pub struct MemoryFilterStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryFilterStore {
    /// Seed the store with a raw blob under `key`.
    #[must_use]
    pub fn with_blob(key: &str, blob: &str) -> Self {
        Self {
            blobs: Mutex::new(HashMap::from([(key.to_owned(), blob.to_owned())])),
        }
    }

    /// Raw blob stored under `key`.
    #[must_use]
    pub fn blob(&self, key: &str) -> Option<String> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl FilterStore for MemoryFilterStore {
    async fn save(&self, key: &str, filters: &FilterCriteria) -> Result<(), FilterStoreError> {
        let blob = serde_json::to_string(filters)
            .map_err(|error| FilterStoreError::encode(error.to_string()))?;
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), blob);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<FilterCriteria>, FilterStoreError> {
        let Some(blob) = self.blob(key) else {
            return Ok(None);
        };
        serde_json::from_str(&blob)
            .map(Some)
            .map_err(|error| FilterStoreError::decode(error.to_string()))
    }
}

fn file_name_for(key: &str) -> Result<String, FilterStoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(format!("{key}.json"))
    } else {
        Err(FilterStoreError::invalid_key(key))
    }
}

fn io_error(path: &Path, error: &io::Error) -> FilterStoreError {
    FilterStoreError::io(format!("{}: {error}", path.display()))
}
