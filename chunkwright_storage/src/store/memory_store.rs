//! A synchronous in-memory store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{
    Bytes, ListableStoreTraits, MaybeBytes, ReadableStoreTraits, StorageError, StoreKey,
    StoreKeys, WritableStoreTraits,
};

/// A synchronous in-memory store.
///
/// Keys list in sorted order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: Mutex<BTreeMap<StoreKey, Bytes>>,
}

impl MemoryStore {
    /// Create a new memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadableStoreTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.lock().unwrap();
        Ok(data_map.get(key).cloned())
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let data_map = self.data_map.lock().unwrap();
        Ok(data_map.get(key).map(|data| data.len() as u64))
    }
}

impl WritableStoreTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        let mut data_map = self.data_map.lock().unwrap();
        data_map.insert(key.clone(), value);
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let mut data_map = self.data_map.lock().unwrap();
        data_map.remove(key);
        Ok(())
    }
}

impl ListableStoreTraits for MemoryStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.lock().unwrap();
        Ok(data_map.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/b").unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
        store.set(&key, Bytes::from_static(b"hello")).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(Bytes::from_static(b"hello")));
        assert_eq!(store.size_key(&key).unwrap(), Some(5));

        let key2 = StoreKey::new("a/c").unwrap();
        store.set(&key2, Bytes::from_static(b"x")).unwrap();
        assert_eq!(store.list().unwrap(), vec![key.clone(), key2.clone()]);
        assert_eq!(store.list_prefix("a").unwrap().len(), 2);
        assert_eq!(store.list_prefix("a/b").unwrap(), vec![key.clone()]);

        store.erase(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
    }
}
