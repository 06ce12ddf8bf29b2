use crate::{Bytes, MaybeBytes, StorageError, StoreKey, StoreKeys};

/// Readable store traits.
pub trait ReadableStoreTraits: Send + Sync {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Return the size in bytes of the value at `key`.
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError>;
}

/// Writable store traits.
pub trait WritableStoreTraits: Send + Sync {
    /// Store bytes at a [`StoreKey`], replacing any existing value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError>;

    /// Erase a [`StoreKey`]. Succeeds if the key does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase(&self, key: &StoreKey) -> Result<(), StorageError>;
}

/// Listable store traits.
pub trait ListableStoreTraits: Send + Sync {
    /// Retrieve all [`StoreKeys`] in the store, sorted.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn list(&self) -> Result<StoreKeys, StorageError>;

    /// Retrieve all [`StoreKeys`] under the slash-delimited `prefix`, sorted.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn list_prefix(&self, prefix: &str) -> Result<StoreKeys, StorageError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|key| {
                key.as_str()
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .collect())
    }
}

/// A supertrait of [`ReadableStoreTraits`], [`WritableStoreTraits`], and
/// [`ListableStoreTraits`].
pub trait ReadableWritableListableStoreTraits:
    ReadableStoreTraits + WritableStoreTraits + ListableStoreTraits
{
}

impl<T> ReadableWritableListableStoreTraits for T where
    T: ReadableStoreTraits + WritableStoreTraits + ListableStoreTraits
{
}
