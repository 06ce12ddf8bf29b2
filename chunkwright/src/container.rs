//! Container formats.
//!
//! Two backend families are supported: a classic chunked-binary single-file
//! format ([`classic`]) and a cloud-object chunked multi-file format
//! ([`cloud`]). Both store named compression codecs with optional parameters,
//! per-dataset chunk shape metadata, external-reference leaves, and JSON
//! attribute leaves.

pub mod classic;
pub mod cloud;
mod metadata;

pub use metadata::{DatasetMetadata, ExternalReferenceMetadata};

use bytes::Bytes;
use thiserror::Error;

use chunkwright_storage::StorageError;

use crate::dataset::{DatasetLocation, UnknownDataTypeError};

/// A backend container family.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    /// The classic chunked-binary single-file family.
    #[display("classic")]
    Classic,
    /// The cloud-object chunked multi-file family.
    #[display("cloud")]
    Cloud,
}

/// A destination container write error.
#[derive(Debug, Error)]
pub enum DestinationWriteError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// Container metadata failed to serialize.
    #[error("failed to serialize container metadata: {_0}")]
    Metadata(#[from] serde_json::Error),
    /// A chunk was written for a dataset that was never begun.
    #[error("dataset {_0} was not begun before writing chunks")]
    UnknownDataset(DatasetLocation),
    /// A dataset was begun twice.
    #[error("dataset {_0} already exists in the destination container")]
    DuplicateDataset(DatasetLocation),
    /// The container was already finished.
    #[error("the container is already finished")]
    AlreadyFinished,
}

/// A container introspection error.
#[derive(Debug, Error)]
pub enum IntrospectError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An unknown data type name in container metadata.
    #[error(transparent)]
    UnknownDataType(#[from] UnknownDataTypeError),
    /// Malformed container metadata.
    #[error("malformed container metadata at {location}: {message}")]
    Malformed {
        /// Where the malformed metadata was found.
        location: String,
        /// What is malformed.
        message: String,
    },
    /// A dataset is absent from the container.
    #[error("unknown dataset {_0}")]
    UnknownDataset(DatasetLocation),
    /// A chunk is absent from the container.
    #[error("missing chunk {indices:?} of dataset {location}")]
    MissingChunk {
        /// The dataset location.
        location: DatasetLocation,
        /// The chunk indices.
        indices: Vec<u64>,
    },
}

/// A dataset recovered from an existing container: its location and the
/// verbatim on-disk metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct IntrospectedDataset {
    /// The dataset location.
    pub location: DatasetLocation,
    /// The on-disk metadata, not re-derived.
    pub metadata: DatasetMetadata,
}

/// A non-data leaf of a container, copied byte-for-byte without planning.
#[derive(Clone, Debug, PartialEq)]
pub enum NonDataEntry {
    /// A pointer to data kept outside the container.
    ExternalReference(String),
    /// A small JSON attribute.
    Attribute(serde_json::Value),
}

/// Traits for a destination container accepting datasets chunk by chunk.
///
/// A sink serializes actual byte writes: it is a single shared append target,
/// and at most one write transaction is in flight per destination at a time.
pub trait ContainerSink {
    /// The backend family of the sink.
    fn family(&self) -> BackendFamily;

    /// Begin a dataset at `location` with the given metadata.
    ///
    /// # Errors
    /// Returns a [`DestinationWriteError`] on duplicate locations or storage failure.
    fn begin_dataset(
        &mut self,
        location: &DatasetLocation,
        metadata: &DatasetMetadata,
    ) -> Result<(), DestinationWriteError>;

    /// Append one encoded chunk of a begun dataset.
    ///
    /// An unchunked dataset (no chunk shape metadata) stores its whole value
    /// as a single chunk at indices `[0; rank]`.
    ///
    /// # Errors
    /// Returns a [`DestinationWriteError`] if the dataset was never begun or on storage failure.
    fn write_chunk(
        &mut self,
        location: &DatasetLocation,
        chunk_indices: &[u64],
        bytes: Bytes,
    ) -> Result<(), DestinationWriteError>;

    /// Store an external-reference leaf at `location`.
    ///
    /// # Errors
    /// Returns a [`DestinationWriteError`] on storage failure.
    fn write_external_reference(
        &mut self,
        location: &DatasetLocation,
        target: &str,
    ) -> Result<(), DestinationWriteError>;

    /// Store a JSON attribute leaf at `location`.
    ///
    /// # Errors
    /// Returns a [`DestinationWriteError`] on storage failure.
    fn write_attribute(
        &mut self,
        location: &DatasetLocation,
        value: &serde_json::Value,
    ) -> Result<(), DestinationWriteError>;

    /// Commit the container.
    ///
    /// # Errors
    /// Returns a [`DestinationWriteError`] on storage failure or double finish.
    fn finish(&mut self) -> Result<(), DestinationWriteError>;
}

/// Traits for an already-written container opened read-only.
pub trait ContainerReader: Send + Sync {
    /// The backend family of the container.
    fn family(&self) -> BackendFamily;

    /// List the datasets of the container in a deterministic order, with
    /// their on-disk metadata recovered verbatim.
    ///
    /// # Errors
    /// Returns an [`IntrospectError`] on storage failure or malformed metadata.
    fn datasets(&self) -> Result<Vec<IntrospectedDataset>, IntrospectError>;

    /// Read the raw (still encoded) bytes of one chunk.
    ///
    /// # Errors
    /// Returns an [`IntrospectError`] if the dataset or chunk is absent.
    fn read_chunk(
        &self,
        location: &DatasetLocation,
        chunk_indices: &[u64],
    ) -> Result<Bytes, IntrospectError>;

    /// List the non-data leaves of the container.
    ///
    /// # Errors
    /// Returns an [`IntrospectError`] on storage failure or malformed metadata.
    fn non_data_entries(&self) -> Result<Vec<(DatasetLocation, NonDataEntry)>, IntrospectError>;
}

/// Format a chunk index as a dot-separated string, e.g. `0.2.1`.
pub(crate) fn chunk_index_name(chunk_indices: &[u64]) -> String {
    itertools::Itertools::join(&mut chunk_indices.iter(), ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_family_display_and_serde() {
        assert_eq!(BackendFamily::Classic.to_string(), "classic");
        assert_eq!(BackendFamily::Cloud.to_string(), "cloud");
        assert_eq!(
            serde_json::to_string(&BackendFamily::Cloud).unwrap(),
            "\"cloud\""
        );
        assert_eq!(
            serde_json::from_str::<BackendFamily>("\"classic\"").unwrap(),
            BackendFamily::Classic
        );
    }

    #[test]
    fn chunk_index_names() {
        assert_eq!(chunk_index_name(&[0]), "0");
        assert_eq!(chunk_index_name(&[1, 2, 3]), "1.2.3");
    }
}
