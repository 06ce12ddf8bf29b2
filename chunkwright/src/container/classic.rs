//! The classic chunked-binary single-file container.
//!
//! Layout: an 8-byte magic, followed by appended chunk records, followed by a
//! JSON footer indexing every dataset and its chunk byte extents, followed by
//! a fixed trailer (footer offset, footer length, magic again). The footer is
//! written on [`finish`](crate::container::ContainerSink::finish); a file
//! without a trailer is an aborted write.

use std::collections::HashMap;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::dataset::DatasetLocation;

use super::{
    BackendFamily, ContainerReader, ContainerSink, DatasetMetadata, DestinationWriteError,
    IntrospectError, IntrospectedDataset, NonDataEntry,
};

const MAGIC: &[u8; 8] = b"CWRCLS01";
const TRAILER_LEN: u64 = 8 + 8 + 8;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct ChunkRecord {
    indices: Vec<u64>,
    offset: u64,
    nbytes: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct DatasetEntry {
    location: DatasetLocation,
    metadata: DatasetMetadata,
    chunks: Vec<ChunkRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct ExternalEntry {
    location: DatasetLocation,
    target: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct AttributeEntry {
    location: DatasetLocation,
    value: serde_json::Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
struct Footer {
    datasets: Vec<DatasetEntry>,
    #[serde(default)]
    externals: Vec<ExternalEntry>,
    #[serde(default)]
    attributes: Vec<AttributeEntry>,
}

/// A classic single-file container being written.
pub struct ClassicContainerWriter {
    file: BufWriter<std::fs::File>,
    offset: u64,
    footer: Footer,
    dataset_index: HashMap<DatasetLocation, usize>,
    finished: bool,
}

impl ClassicContainerWriter {
    /// Create a new classic container at `path`, truncating any existing file.
    ///
    /// # Errors
    /// Returns a [`DestinationWriteError`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DestinationWriteError> {
        let mut file = BufWriter::new(std::fs::File::create(path)?);
        file.write_all(MAGIC)?;
        Ok(Self {
            file,
            offset: MAGIC.len() as u64,
            footer: Footer::default(),
            dataset_index: HashMap::new(),
            finished: false,
        })
    }

    fn check_unfinished(&self) -> Result<(), DestinationWriteError> {
        if self.finished {
            Err(DestinationWriteError::AlreadyFinished)
        } else {
            Ok(())
        }
    }
}

impl ContainerSink for ClassicContainerWriter {
    fn family(&self) -> BackendFamily {
        BackendFamily::Classic
    }

    fn begin_dataset(
        &mut self,
        location: &DatasetLocation,
        metadata: &DatasetMetadata,
    ) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        if self.dataset_index.contains_key(location) {
            return Err(DestinationWriteError::DuplicateDataset(location.clone()));
        }
        self.dataset_index
            .insert(location.clone(), self.footer.datasets.len());
        self.footer.datasets.push(DatasetEntry {
            location: location.clone(),
            metadata: metadata.clone(),
            chunks: Vec::new(),
        });
        Ok(())
    }

    fn write_chunk(
        &mut self,
        location: &DatasetLocation,
        chunk_indices: &[u64],
        bytes: Bytes,
    ) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        let index = *self
            .dataset_index
            .get(location)
            .ok_or_else(|| DestinationWriteError::UnknownDataset(location.clone()))?;
        self.file.write_all(&bytes)?;
        self.footer.datasets[index].chunks.push(ChunkRecord {
            indices: chunk_indices.to_vec(),
            offset: self.offset,
            nbytes: bytes.len() as u64,
        });
        self.offset += bytes.len() as u64;
        Ok(())
    }

    fn write_external_reference(
        &mut self,
        location: &DatasetLocation,
        target: &str,
    ) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        self.footer.externals.push(ExternalEntry {
            location: location.clone(),
            target: target.to_string(),
        });
        Ok(())
    }

    fn write_attribute(
        &mut self,
        location: &DatasetLocation,
        value: &serde_json::Value,
    ) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        self.footer.attributes.push(AttributeEntry {
            location: location.clone(),
            value: value.clone(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DestinationWriteError> {
        self.check_unfinished()?;
        let footer = serde_json::to_vec(&self.footer)?;
        self.file.write_all(&footer)?;
        self.file.write_all(&self.offset.to_le_bytes())?;
        self.file.write_all(&(footer.len() as u64).to_le_bytes())?;
        self.file.write_all(MAGIC)?;
        self.file.flush()?;
        self.finished = true;
        Ok(())
    }
}

/// A classic single-file container opened read-only.
pub struct ClassicContainerReader {
    file: Mutex<std::fs::File>,
    footer: Footer,
    chunk_index: HashMap<DatasetLocation, HashMap<Vec<u64>, (u64, u64)>>,
}

impl ClassicContainerReader {
    /// Open an existing classic container at `path`.
    ///
    /// # Errors
    /// Returns an [`IntrospectError`] if the file is missing, truncated, or
    /// carries a malformed footer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IntrospectError> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path)?;

        let mut magic = [0u8; 8];
        file.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(IntrospectError::Malformed {
                location: path.display().to_string(),
                message: "not a classic container (bad leading magic)".to_string(),
            });
        }

        let len = file.metadata()?.len();
        if len < MAGIC.len() as u64 + TRAILER_LEN {
            return Err(IntrospectError::Malformed {
                location: path.display().to_string(),
                message: "truncated container (no trailer)".to_string(),
            });
        }
        file.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
        let mut trailer = [0u8; TRAILER_LEN as usize];
        file.read_exact(&mut trailer)?;
        if &trailer[16..24] != MAGIC {
            return Err(IntrospectError::Malformed {
                location: path.display().to_string(),
                message: "missing trailer magic (aborted write?)".to_string(),
            });
        }
        let footer_offset = u64::from_le_bytes(trailer[0..8].try_into().expect("8 bytes"));
        let footer_len = u64::from_le_bytes(trailer[8..16].try_into().expect("8 bytes"));
        if footer_offset + footer_len + TRAILER_LEN != len {
            return Err(IntrospectError::Malformed {
                location: path.display().to_string(),
                message: "inconsistent footer extent".to_string(),
            });
        }

        file.seek(SeekFrom::Start(footer_offset))?;
        let mut footer_bytes = vec![0u8; footer_len as usize];
        file.read_exact(&mut footer_bytes)?;
        let footer: Footer =
            serde_json::from_slice(&footer_bytes).map_err(|err| IntrospectError::Malformed {
                location: path.display().to_string(),
                message: err.to_string(),
            })?;

        let mut chunk_index = HashMap::new();
        for dataset in &footer.datasets {
            let chunks = dataset
                .chunks
                .iter()
                .map(|record| (record.indices.clone(), (record.offset, record.nbytes)))
                .collect();
            chunk_index.insert(dataset.location.clone(), chunks);
        }

        Ok(Self {
            file: Mutex::new(file),
            footer,
            chunk_index,
        })
    }
}

impl ContainerReader for ClassicContainerReader {
    fn family(&self) -> BackendFamily {
        BackendFamily::Classic
    }

    fn datasets(&self) -> Result<Vec<IntrospectedDataset>, IntrospectError> {
        Ok(self
            .footer
            .datasets
            .iter()
            .map(|dataset| IntrospectedDataset {
                location: dataset.location.clone(),
                metadata: dataset.metadata.clone(),
            })
            .collect())
    }

    fn read_chunk(
        &self,
        location: &DatasetLocation,
        chunk_indices: &[u64],
    ) -> Result<Bytes, IntrospectError> {
        let chunks = self
            .chunk_index
            .get(location)
            .ok_or_else(|| IntrospectError::UnknownDataset(location.clone()))?;
        let &(offset, nbytes) =
            chunks
                .get(chunk_indices)
                .ok_or_else(|| IntrospectError::MissingChunk {
                    location: location.clone(),
                    indices: chunk_indices.to_vec(),
                })?;
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; nbytes as usize];
        file.read_exact(&mut bytes)?;
        Ok(Bytes::from(bytes))
    }

    fn non_data_entries(&self) -> Result<Vec<(DatasetLocation, NonDataEntry)>, IntrospectError> {
        let externals = self.footer.externals.iter().map(|entry| {
            (
                entry.location.clone(),
                NonDataEntry::ExternalReference(entry.target.clone()),
            )
        });
        let attributes = self.footer.attributes.iter().map(|entry| {
            (
                entry.location.clone(),
                NonDataEntry::Attribute(entry.value.clone()),
            )
        });
        Ok(externals.chain(attributes).collect())
    }
}
