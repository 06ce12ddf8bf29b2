use super::{BytesCodec, CodecError, Configuration, configuration_u64};

/// A byte `shuffle` filter implementation.
///
/// Transposes the bytes of fixed-width elements so same-significance bytes
/// become adjacent, which typically improves downstream compression of slowly
/// varying numeric data.
#[derive(Clone, Debug)]
pub struct ShuffleCodec {
    elementsize: usize,
}

impl ShuffleCodec {
    /// Create a new `shuffle` filter.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `elementsize` is zero.
    pub fn new(elementsize: usize) -> Result<Self, CodecError> {
        if elementsize == 0 {
            return Err(CodecError::InvalidConfiguration {
                name: "shuffle".to_string(),
                message: "`elementsize` must be non-zero".to_string(),
            });
        }
        Ok(Self { elementsize })
    }

    /// Create a new `shuffle` filter from configuration options.
    ///
    /// The `elementsize` option defaults to the byte size of the dataset's
    /// element type, `default_elementsize`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if the configuration is not supported.
    pub fn new_with_configuration(
        configuration: Option<&Configuration>,
        default_elementsize: usize,
    ) -> Result<Self, CodecError> {
        match configuration_u64("shuffle", configuration, "elementsize")? {
            Some(elementsize) => Self::new(elementsize as usize),
            None => Self::new(default_elementsize),
        }
    }

    fn check_length(&self, bytes: &[u8]) -> Result<(), CodecError> {
        if bytes.len() % self.elementsize == 0 {
            Ok(())
        } else {
            Err(CodecError::Other(format!(
                "the shuffle filter expects the input byte length to be an integer multiple of the elementsize {}",
                self.elementsize
            )))
        }
    }
}

impl BytesCodec for ShuffleCodec {
    fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.check_length(decoded)?;
        let mut encoded = decoded.to_vec();
        let count = decoded.len() / self.elementsize;
        for i in 0..count {
            let offset = i * self.elementsize;
            for byte_index in 0..self.elementsize {
                encoded[byte_index * count + i] = decoded[offset + byte_index];
            }
        }
        Ok(encoded)
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.check_length(encoded)?;
        let mut decoded = encoded.to_vec();
        let count = encoded.len() / self.elementsize;
        for i in 0..count {
            let offset = i * self.elementsize;
            for byte_index in 0..self.elementsize {
                decoded[offset + byte_index] = encoded[byte_index * count + i];
            }
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_round_trip() {
        let codec = ShuffleCodec::new(4).unwrap();
        let decoded: Vec<u8> = (0..64).collect();
        let encoded = codec.encode(&decoded).unwrap();
        assert_ne!(encoded, decoded);
        assert_eq!(codec.decode(&encoded).unwrap(), decoded);
    }

    #[test]
    fn shuffle_layout() {
        let codec = ShuffleCodec::new(2).unwrap();
        let encoded = codec.encode(&[0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(encoded, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn shuffle_rejects_misaligned_input() {
        let codec = ShuffleCodec::new(4).unwrap();
        assert!(codec.encode(&[0, 1, 2]).is_err());
        assert!(codec.decode(&[0, 1, 2]).is_err());
    }

    #[test]
    fn shuffle_rejects_zero_elementsize() {
        assert!(ShuffleCodec::new(0).is_err());
    }
}
