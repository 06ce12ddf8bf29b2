use std::io::{Cursor, Read};

use flate2::bufread::{GzDecoder, GzEncoder};
use thiserror::Error;

use super::{BytesCodec, CodecError, Configuration, configuration_u64};

/// An invalid gzip compression level error.
#[derive(Clone, Copy, Debug, Error)]
#[error("invalid gzip compression level {_0}, must be 0-9")]
pub struct GzipCompressionLevelError(u64);

/// A gzip compression level, in `0..=9`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GzipCompressionLevel(u32);

impl Default for GzipCompressionLevel {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u64> for GzipCompressionLevel {
    type Error = GzipCompressionLevelError;

    fn try_from(level: u64) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level as u32))
        } else {
            Err(GzipCompressionLevelError(level))
        }
    }
}

impl GzipCompressionLevel {
    /// Return the level as a `u32`.
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A `gzip` codec implementation.
#[derive(Clone, Debug, Default)]
pub struct GzipCodec {
    compression_level: GzipCompressionLevel,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`GzipCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u64) -> Result<Self, GzipCompressionLevelError> {
        Ok(Self {
            compression_level: compression_level.try_into()?,
        })
    }

    /// Create a new `gzip` codec from configuration options.
    ///
    /// The `level` option defaults to 4.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if the configuration is not supported.
    pub fn new_with_configuration(
        configuration: Option<&Configuration>,
    ) -> Result<Self, CodecError> {
        match configuration_u64("gzip", configuration, "level")? {
            Some(level) => Self::new(level).map_err(|err| CodecError::InvalidConfiguration {
                name: "gzip".to_string(),
                message: err.to_string(),
            }),
            None => Ok(Self::default()),
        }
    }
}

impl BytesCodec for GzipCodec {
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(
            Cursor::new(decoded),
            flate2::Compression::new(self.compression_level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
