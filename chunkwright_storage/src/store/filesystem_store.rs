//! A synchronous filesystem store.

use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{
    Bytes, ListableStoreTraits, MaybeBytes, ReadableStoreTraits, StorageError, StoreKey,
    StoreKeys, WritableStoreTraits,
};

/// A synchronous filesystem store.
///
/// Each key maps to a file below the base path, with `/` separators mapped to
/// the platform path separator.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Create a new filesystem store at `base_path`.
    ///
    /// The base directory is created if it does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the base directory cannot be created.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Return the base path of the store.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &StoreKey) -> PathBuf {
        let mut path = self.base_path.clone();
        path.extend(key.as_str().split('/'));
        path
    }
}

impl ReadableStoreTraits for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        match std::fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        match std::fs::metadata(self.key_path(key)) {
            Ok(metadata) => Ok(metadata.is_file().then(|| metadata.len())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl WritableStoreTraits for FilesystemStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        file.write_all(&value)?;
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ListableStoreTraits for FilesystemStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let mut keys: StoreKeys = Vec::new();
        for entry in WalkDir::new(&self.base_path).sort_by_file_name() {
            let entry = entry.map_err(|err| StorageError::Other(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.base_path)
                .map_err(|err| StorageError::Other(err.to_string()))?;
            let key = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(StoreKey::new(key)?);
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(tmp.path()).unwrap();
        let key = StoreKey::new("series/c/0.0").unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
        store.set(&key, Bytes::from_static(b"chunk")).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(Bytes::from_static(b"chunk")));
        assert_eq!(store.size_key(&key).unwrap(), Some(5));
        assert_eq!(store.list().unwrap(), vec![key.clone()]);
        assert_eq!(store.list_prefix("series").unwrap(), vec![key.clone()]);
        assert!(store.list_prefix("serie").unwrap().is_empty());
        store.erase(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
        store.erase(&key).unwrap();
    }
}
