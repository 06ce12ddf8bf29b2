use serde::Serialize;

use chunkwright_grid::ArrayShape;

use crate::compression::Configuration;
use crate::dataset::{DataType, DatasetLocation};

/// What was actually written for one dataset.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ManifestEntry {
    /// The dataset location.
    pub location: DatasetLocation,
    /// The full shape of the dataset.
    pub full_shape: ArrayShape,
    /// The element type of the dataset.
    pub data_type: DataType,
    /// The chunk shape metadata, or [`None`] for a contiguous dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_shape: Option<ArrayShape>,
    /// The compression method, or [`None`] for an uncompressed dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_method: Option<String>,
    /// The compression options, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_options: Option<Configuration>,
}

/// The committed manifest of one write or repack pass, in commit order.
///
/// Downstream tooling and tests verify what was actually written from this.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct WriteManifest {
    /// One entry per committed dataset.
    pub entries: Vec<ManifestEntry>,
}

impl WriteManifest {
    /// Return the entry for the dataset at `location`.
    #[must_use]
    pub fn entry(&self, location: &DatasetLocation) -> Option<&ManifestEntry> {
        self.entries.iter().find(|entry| &entry.location == location)
    }

    /// Serialize the manifest as pretty JSON.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
