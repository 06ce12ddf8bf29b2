use serde::{Deserialize, Deserializer};

use crate::compression::Configuration;

/// A patch applied over one dataset configuration.
///
/// Every field is optional; an absent field leaves the configuration
/// untouched. `compression_method` distinguishes an absent field from an
/// explicit `null`: `null` disables compression deliberately.
///
/// For example, as JSON:
/// ```json
/// {
///     "chunk_shape": [5000, 64],
///     "compression_method": "zstd",
///     "compression_options": {"level": 7}
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetOverride {
    /// Replace the chunk shape. Clears the buffer shape unless one is also
    /// supplied, leaving the writer to derive a compatible buffer.
    #[serde(default)]
    pub chunk_shape: Option<Vec<u64>>,
    /// Replace the buffer shape.
    #[serde(default)]
    pub buffer_shape: Option<Vec<u64>>,
    /// Replace the compression method. `Some(None)` (JSON `null`) disables
    /// compression explicitly.
    #[serde(default, deserialize_with = "deserialize_explicit")]
    pub compression_method: Option<Option<String>>,
    /// Replace the compression options. Only meaningful together with
    /// `compression_method`.
    #[serde(default)]
    pub compression_options: Option<Configuration>,
    /// Replace the filter chain (cloud-object family only). An empty list
    /// clears the chain.
    #[serde(default)]
    pub filter_methods: Option<Vec<String>>,
    /// Per-filter options, aligned with `filter_methods`.
    #[serde(default)]
    pub filter_options: Option<Vec<Option<Configuration>>>,
}

/// Deserialize a present-but-possibly-null field into `Some(Option<T>)`.
fn deserialize_explicit<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_absent_versus_null_method() {
        let absent: DatasetOverride = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.compression_method, None);

        let null: DatasetOverride =
            serde_json::from_str(r#"{"compression_method": null}"#).unwrap();
        assert_eq!(null.compression_method, Some(None));

        let named: DatasetOverride =
            serde_json::from_str(r#"{"compression_method": "zstd"}"#).unwrap();
        assert_eq!(named.compression_method, Some(Some("zstd".to_string())));
    }

    #[test]
    fn override_rejects_unknown_fields() {
        assert!(serde_json::from_str::<DatasetOverride>(r#"{"chunks": [1]}"#).is_err());
    }
}
