use serde::{Deserialize, Serialize};

use chunkwright_grid::ArrayShape;

use crate::compression::NamedConfiguration;
use crate::dataset::DataType;

/// The on-disk metadata of one dataset, shared by both backend families.
///
/// For example:
/// ```json
/// {
///     "shape": [20000, 128],
///     "data_type": "int16",
///     "chunk_shape": [4096, 64],
///     "compressor": {"name": "gzip", "configuration": {"level": 4}}
/// }
/// ```
///
/// `chunk_shape` is absent for an unchunked (contiguous) dataset and
/// `compressor` is absent for an uncompressed dataset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DatasetMetadata {
    /// The full shape of the dataset.
    pub shape: ArrayShape,
    /// The element type of the dataset.
    pub data_type: DataType,
    /// The chunk shape, or [`None`] for a whole-array contiguous dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_shape: Option<Vec<u64>>,
    /// The primary compressor, or [`None`] for an uncompressed dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressor: Option<NamedConfiguration>,
    /// The ordered pre-compression filter chain (cloud-object family only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<NamedConfiguration>>,
}

/// The stored form of an external-reference leaf: a path string instead of
/// embedded data.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExternalReferenceMetadata {
    /// The path of the externally stored data.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Configuration;

    #[test]
    fn dataset_metadata_round_trip() {
        let mut options = Configuration::new();
        options.insert("level".to_string(), 5.into());
        let metadata = DatasetMetadata {
            shape: vec![100, 64],
            data_type: DataType::Int16,
            chunk_shape: Some(vec![10, 64]),
            compressor: Some(NamedConfiguration::new_with_configuration("gzip", options)),
            filters: None,
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(
            serde_json::from_str::<DatasetMetadata>(&json).unwrap(),
            metadata
        );
        assert!(!json.contains("filters"));
    }

    #[test]
    fn dataset_metadata_unchunked_uncompressed() {
        let metadata = DatasetMetadata {
            shape: vec![16],
            data_type: DataType::Float64,
            chunk_shape: None,
            compressor: None,
            filters: None,
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"shape":[16],"data_type":"float64"}"#);
        assert_eq!(
            serde_json::from_str::<DatasetMetadata>(&json).unwrap(),
            metadata
        );
    }
}
