//! The cloud-object chunked multi-file container.
//!
//! Each dataset maps to a `dataset.json` metadata key plus one key per chunk
//! under `c/`, e.g. `acquisition/series/data/c/3.0`. External-reference and
//! attribute leaves map to `external.json` and `attribute.json` keys. Any
//! [`chunkwright_storage`] store can hold the container, so the same layout
//! works on a local directory tree or an object store.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;

use chunkwright_storage::{
    ReadableWritableListableStoreTraits, StorageError, StoreKey,
};

use crate::dataset::DatasetLocation;

use super::{
    BackendFamily, ContainerReader, ContainerSink, DatasetMetadata, DestinationWriteError,
    ExternalReferenceMetadata, IntrospectError, IntrospectedDataset, NonDataEntry,
    chunk_index_name,
};

const DATASET_METADATA_KEY: &str = "dataset.json";
const EXTERNAL_KEY: &str = "external.json";
const ATTRIBUTE_KEY: &str = "attribute.json";

fn leaf_key(location: &DatasetLocation, leaf: &str) -> Result<StoreKey, StorageError> {
    Ok(StoreKey::new(format!("{location}/{leaf}"))?)
}

/// A cloud-object container being written into a store.
pub struct CloudContainerWriter {
    store: Arc<dyn ReadableWritableListableStoreTraits>,
    datasets: HashSet<DatasetLocation>,
    finished: bool,
}

impl CloudContainerWriter {
    /// Create a new cloud-object container writer over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ReadableWritableListableStoreTraits>) -> Self {
        Self {
            store,
            datasets: HashSet::new(),
            finished: false,
        }
    }

    fn check_unfinished(&self) -> Result<(), DestinationWriteError> {
        if self.finished {
            Err(DestinationWriteError::AlreadyFinished)
        } else {
            Ok(())
        }
    }
}

impl ContainerSink for CloudContainerWriter {
    fn family(&self) -> BackendFamily {
        BackendFamily::Cloud
    }

    fn begin_dataset(
        &mut self,
        location: &DatasetLocation,
        metadata: &DatasetMetadata,
    ) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        if !self.datasets.insert(location.clone()) {
            return Err(DestinationWriteError::DuplicateDataset(location.clone()));
        }
        let key = leaf_key(location, DATASET_METADATA_KEY)?;
        let bytes = serde_json::to_vec(metadata)?;
        self.store.set(&key, Bytes::from(bytes))?;
        Ok(())
    }

    fn write_chunk(
        &mut self,
        location: &DatasetLocation,
        chunk_indices: &[u64],
        bytes: Bytes,
    ) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        if !self.datasets.contains(location) {
            return Err(DestinationWriteError::UnknownDataset(location.clone()));
        }
        let key = leaf_key(location, &format!("c/{}", chunk_index_name(chunk_indices)))?;
        self.store.set(&key, bytes)?;
        Ok(())
    }

    fn write_external_reference(
        &mut self,
        location: &DatasetLocation,
        target: &str,
    ) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        let key = leaf_key(location, EXTERNAL_KEY)?;
        let metadata = ExternalReferenceMetadata {
            path: target.to_string(),
        };
        self.store.set(&key, Bytes::from(serde_json::to_vec(&metadata)?))?;
        Ok(())
    }

    fn write_attribute(
        &mut self,
        location: &DatasetLocation,
        value: &serde_json::Value,
    ) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        let key = leaf_key(location, ATTRIBUTE_KEY)?;
        self.store.set(&key, Bytes::from(serde_json::to_vec(value)?))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DestinationWriteError> {
        // Store writes are immediate; finishing only seals the writer.
        self.check_unfinished()?;
        self.finished = true;
        Ok(())
    }
}

/// A cloud-object container opened read-only over a store.
pub struct CloudContainerReader {
    store: Arc<dyn ReadableWritableListableStoreTraits>,
}

impl CloudContainerReader {
    /// Open a cloud-object container over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ReadableWritableListableStoreTraits>) -> Self {
        Self { store }
    }

    fn get_required(&self, key: &StoreKey) -> Result<Bytes, IntrospectError> {
        self.store
            .get(key)?
            .ok_or_else(|| IntrospectError::Malformed {
                location: key.to_string(),
                message: "missing key".to_string(),
            })
    }

    /// Keys ending in `/{leaf}`, paired with the location they belong to.
    fn leaf_locations(&self, leaf: &str) -> Result<Vec<(DatasetLocation, StoreKey)>, IntrospectError> {
        let suffix = format!("/{leaf}");
        let mut locations = Vec::new();
        for key in self.store.list()? {
            if let Some(prefix) = key.as_str().strip_suffix(&suffix) {
                let location =
                    DatasetLocation::new(prefix).map_err(|err| IntrospectError::Malformed {
                        location: key.to_string(),
                        message: err.to_string(),
                    })?;
                locations.push((location, key));
            }
        }
        Ok(locations)
    }
}

impl ContainerReader for CloudContainerReader {
    fn family(&self) -> BackendFamily {
        BackendFamily::Cloud
    }

    fn datasets(&self) -> Result<Vec<IntrospectedDataset>, IntrospectError> {
        let mut datasets = Vec::new();
        for (location, key) in self.leaf_locations(DATASET_METADATA_KEY)? {
            let bytes = self.get_required(&key)?;
            let metadata: DatasetMetadata =
                serde_json::from_slice(&bytes).map_err(|err| IntrospectError::Malformed {
                    location: key.to_string(),
                    message: err.to_string(),
                })?;
            datasets.push(IntrospectedDataset { location, metadata });
        }
        Ok(datasets)
    }

    fn read_chunk(
        &self,
        location: &DatasetLocation,
        chunk_indices: &[u64],
    ) -> Result<Bytes, IntrospectError> {
        let key = StoreKey::new(format!(
            "{location}/c/{}",
            chunk_index_name(chunk_indices)
        ))
        .map_err(StorageError::from)?;
        self.store
            .get(&key)?
            .ok_or_else(|| IntrospectError::MissingChunk {
                location: location.clone(),
                indices: chunk_indices.to_vec(),
            })
    }

    fn non_data_entries(&self) -> Result<Vec<(DatasetLocation, NonDataEntry)>, IntrospectError> {
        let mut entries = Vec::new();
        for (location, key) in self.leaf_locations(EXTERNAL_KEY)? {
            let bytes = self.get_required(&key)?;
            let metadata: ExternalReferenceMetadata =
                serde_json::from_slice(&bytes).map_err(|err| IntrospectError::Malformed {
                    location: key.to_string(),
                    message: err.to_string(),
                })?;
            entries.push((location, NonDataEntry::ExternalReference(metadata.path)));
        }
        for (location, key) in self.leaf_locations(ATTRIBUTE_KEY)? {
            let bytes = self.get_required(&key)?;
            let value: serde_json::Value =
                serde_json::from_slice(&bytes).map_err(|err| IntrospectError::Malformed {
                    location: key.to_string(),
                    message: err.to_string(),
                })?;
            entries.push((location, NonDataEntry::Attribute(value)));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataType;
    use chunkwright_storage::store::MemoryStore;

    #[test]
    fn cloud_write_read_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let location = DatasetLocation::new("processing/dff/data").unwrap();
        let metadata = DatasetMetadata {
            shape: vec![8],
            data_type: DataType::Float32,
            chunk_shape: Some(vec![4]),
            compressor: None,
            filters: None,
        };

        let mut writer = CloudContainerWriter::new(store.clone());
        writer.begin_dataset(&location, &metadata).unwrap();
        writer
            .write_chunk(&location, &[1], Bytes::from_static(&[9, 9, 9, 9]))
            .unwrap();
        writer
            .write_attribute(
                &DatasetLocation::new("processing/dff/unit").unwrap(),
                &serde_json::json!("dF/F"),
            )
            .unwrap();
        writer.finish().unwrap();

        let reader = CloudContainerReader::new(store);
        assert_eq!(reader.family(), BackendFamily::Cloud);
        let datasets = reader.datasets().unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].location, location);
        assert_eq!(datasets[0].metadata, metadata);
        assert_eq!(
            reader.read_chunk(&location, &[1]).unwrap(),
            Bytes::from_static(&[9, 9, 9, 9])
        );
        assert!(matches!(
            reader.read_chunk(&location, &[0]),
            Err(IntrospectError::MissingChunk { .. })
        ));
        let non_data = reader.non_data_entries().unwrap();
        assert_eq!(non_data.len(), 1);
        assert_eq!(
            non_data[0].1,
            NonDataEntry::Attribute(serde_json::json!("dF/F"))
        );
    }

    #[test]
    fn cloud_rejects_duplicate_dataset() {
        let store = Arc::new(MemoryStore::new());
        let location = DatasetLocation::new("a").unwrap();
        let metadata = DatasetMetadata {
            shape: vec![1],
            data_type: DataType::UInt8,
            chunk_shape: None,
            compressor: None,
            filters: None,
        };
        let mut writer = CloudContainerWriter::new(store);
        writer.begin_dataset(&location, &metadata).unwrap();
        assert!(matches!(
            writer.begin_dataset(&location, &metadata),
            Err(DestinationWriteError::DuplicateDataset(_))
        ));
    }
}
