//! Compression codecs and the compression catalog.
//!
//! The catalog is an explicitly constructed, immutable value passed into
//! build/write/repack calls. There is no process-wide codec registry, so
//! per-call overrides and deterministic tests need no global state.

mod catalog;
mod gzip;
mod pipeline;
mod shuffle;
mod zstd;

pub use catalog::{CodecRole, CompressionCatalog, UnknownCompressionMethodError};
pub use gzip::{GzipCodec, GzipCompressionLevel, GzipCompressionLevelError};
pub use pipeline::CodecPipeline;
pub use shuffle::ShuffleCodec;
pub use zstd::ZstdCodec;

use thiserror::Error;

/// An order-preserving map of codec option names to values.
pub type Configuration = serde_json::Map<String, serde_json::Value>;

/// A codec name with optional configuration, as stored in container metadata.
///
/// For example:
/// ```json
/// {
///     "name": "gzip",
///     "configuration": {"level": 4}
/// }
/// ```
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Debug)]
pub struct NamedConfiguration {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    configuration: Option<Configuration>,
}

impl NamedConfiguration {
    /// Create a new named configuration without options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: None,
        }
    }

    /// Create a new named configuration with options.
    #[must_use]
    pub fn new_with_configuration(name: impl Into<String>, configuration: Configuration) -> Self {
        Self {
            name: name.into(),
            configuration: Some(configuration),
        }
    }

    /// Return the codec name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the codec options, if any.
    #[must_use]
    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid codec configuration.
    #[error("invalid {name} codec configuration: {message}")]
    InvalidConfiguration {
        /// The codec name.
        name: String,
        /// What is wrong with the configuration.
        message: String,
    },
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

/// A compression resolution error.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// The requested method is absent from the catalog for the backend family.
    #[error(transparent)]
    UnknownMethod(#[from] UnknownCompressionMethodError),
    /// A codec rejected its configuration.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Traits for a codec transforming encoded bytes to decoded bytes and back.
pub trait BytesCodec: Send + Sync + std::fmt::Debug {
    /// Encode `decoded` bytes.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if encoding fails.
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode `encoded` bytes.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if decoding fails.
    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Read an unsigned integer option from a codec configuration.
fn configuration_u64(
    codec_name: &str,
    configuration: Option<&Configuration>,
    key: &str,
) -> Result<Option<u64>, CodecError> {
    let Some(value) = configuration.and_then(|configuration| configuration.get(key)) else {
        return Ok(None);
    };
    value
        .as_u64()
        .map(Some)
        .ok_or_else(|| CodecError::InvalidConfiguration {
            name: codec_name.to_string(),
            message: format!("`{key}` must be an unsigned integer, got {value}"),
        })
}
