//! The storage API for the [`chunkwright`](https://docs.rs/chunkwright/latest/chunkwright/index.html) crate.
//!
//! A store is a flat key/value system holding the files of a cloud-object
//! container: JSON metadata documents and encoded chunks. This crate includes
//! an in-memory store and a filesystem store.
//!
//! ## Licence
//! `chunkwright_storage` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

mod storage_sync;
pub mod store;
mod store_key;

use std::sync::Arc;

use thiserror::Error;

pub use bytes::Bytes;

pub use self::storage_sync::{
    ListableStoreTraits, ReadableStoreTraits, ReadableWritableListableStoreTraits,
    WritableStoreTraits,
};
pub use self::store_key::{StoreKey, StoreKeyError, StoreKeys};

/// [`Arc`] wrapped readable, writable, and listable store.
pub type ReadableWritableListableStore = Arc<dyn ReadableWritableListableStoreTraits>;

/// [`Bytes`] or [`None`] if a key is not found.
pub type MaybeBytes = Option<Bytes>;

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid store key.
    #[error(transparent)]
    InvalidStoreKey(#[from] StoreKeyError),
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}
