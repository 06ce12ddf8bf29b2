use super::{BytesCodec, CodecError, Configuration, configuration_u64};

const ZSTD_DEFAULT_LEVEL: i32 = 3;
const ZSTD_MAX_LEVEL: u64 = 22;

/// A `zstd` codec implementation.
#[derive(Clone, Debug)]
pub struct ZstdCodec {
    compression_level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self {
            compression_level: ZSTD_DEFAULT_LEVEL,
        }
    }
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `compression_level` exceeds the zstd maximum.
    pub fn new(compression_level: u64) -> Result<Self, CodecError> {
        if compression_level > ZSTD_MAX_LEVEL {
            return Err(CodecError::InvalidConfiguration {
                name: "zstd".to_string(),
                message: format!(
                    "invalid zstd compression level {compression_level}, must be 0-{ZSTD_MAX_LEVEL}"
                ),
            });
        }
        Ok(Self {
            compression_level: compression_level as i32,
        })
    }

    /// Create a new `zstd` codec from configuration options.
    ///
    /// The `level` option defaults to 3.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if the configuration is not supported.
    pub fn new_with_configuration(
        configuration: Option<&Configuration>,
    ) -> Result<Self, CodecError> {
        match configuration_u64("zstd", configuration, "level")? {
            Some(level) => Self::new(level),
            None => Ok(Self::default()),
        }
    }
}

impl BytesCodec for ZstdCodec {
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(zstd::encode_all(decoded, self.compression_level)?)
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(zstd::decode_all(encoded)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstd_round_trip() {
        let codec = ZstdCodec::default();
        let decoded: Vec<u8> = (0..=255).cycle().take(20_000).collect();
        let encoded = codec.encode(&decoded).unwrap();
        assert!(encoded.len() < decoded.len());
        assert_eq!(codec.decode(&encoded).unwrap(), decoded);
    }

    #[test]
    fn zstd_configuration() {
        let mut configuration = Configuration::new();
        configuration.insert("level".to_string(), 19.into());
        assert!(ZstdCodec::new_with_configuration(Some(&configuration)).is_ok());
        configuration.insert("level".to_string(), 23.into());
        assert!(ZstdCodec::new_with_configuration(Some(&configuration)).is_err());
    }
}
