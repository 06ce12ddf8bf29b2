use std::sync::Arc;

use super::{BytesCodec, CodecError};

/// A resolved encode/decode pipeline: zero or more filters followed by an
/// optional primary compressor.
#[derive(Clone, Debug, Default)]
pub struct CodecPipeline {
    filters: Vec<Arc<dyn BytesCodec>>,
    compressor: Option<Arc<dyn BytesCodec>>,
}

impl CodecPipeline {
    /// Create a new codec pipeline.
    #[must_use]
    pub fn new(filters: Vec<Arc<dyn BytesCodec>>, compressor: Option<Arc<dyn BytesCodec>>) -> Self {
        Self {
            filters,
            compressor,
        }
    }

    /// Returns true if the pipeline passes bytes through unchanged.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.filters.is_empty() && self.compressor.is_none()
    }

    /// Encode bytes: filters in order, then the compressor.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if any codec fails.
    pub fn encode(&self, bytes: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut bytes = bytes;
        for filter in &self.filters {
            bytes = filter.encode(&bytes)?;
        }
        if let Some(compressor) = &self.compressor {
            bytes = compressor.encode(&bytes)?;
        }
        Ok(bytes)
    }

    /// Decode bytes: the compressor, then filters in reverse order.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if any codec fails.
    pub fn decode(&self, bytes: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut bytes = bytes;
        if let Some(compressor) = &self.compressor {
            bytes = compressor.decode(&bytes)?;
        }
        for filter in self.filters.iter().rev() {
            bytes = filter.decode(&bytes)?;
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{GzipCodec, ShuffleCodec};

    #[test]
    fn pipeline_identity() {
        let pipeline = CodecPipeline::default();
        assert!(pipeline.is_identity());
        let bytes = vec![1u8, 2, 3, 4];
        assert_eq!(pipeline.encode(bytes.clone()).unwrap(), bytes);
        assert_eq!(pipeline.decode(bytes.clone()).unwrap(), bytes);
    }

    #[test]
    fn pipeline_filter_then_compressor_round_trip() {
        let pipeline = CodecPipeline::new(
            vec![Arc::new(ShuffleCodec::new(4).unwrap())],
            Some(Arc::new(GzipCodec::new(4).unwrap())),
        );
        let decoded: Vec<u8> = (0..255).cycle().take(4096).collect();
        let encoded = pipeline.encode(decoded.clone()).unwrap();
        assert_ne!(encoded, decoded);
        assert_eq!(pipeline.decode(encoded).unwrap(), decoded);
    }
}
