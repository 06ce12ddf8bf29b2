use bytes::Bytes;

use chunkwright_grid::{ArrayShape, ArraySubset, copy_region};

use crate::dataset::DataType;

use super::{ChunkSource, Element, SourceError};

/// A random-access in-memory source array.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    shape: ArrayShape,
    data_type: DataType,
    bytes: Bytes,
}

impl InMemorySource {
    /// Create a source from a typed element vector in C-contiguous order.
    ///
    /// # Errors
    /// Returns [`SourceError::ElementCountMismatch`] if the element count
    /// does not equal the product of `shape`.
    pub fn from_elements<T: Element>(
        shape: ArrayShape,
        elements: Vec<T>,
    ) -> Result<Self, SourceError> {
        let expected: u64 = shape.iter().product();
        if elements.len() as u64 != expected {
            return Err(SourceError::ElementCountMismatch {
                expected,
                got: elements.len() as u64,
            });
        }
        let bytes = Bytes::from(bytemuck::cast_slice::<T, u8>(&elements).to_vec());
        Ok(Self {
            shape,
            data_type: T::DATA_TYPE,
            bytes,
        })
    }

    /// Create a source from raw C-contiguous bytes.
    ///
    /// # Errors
    /// Returns [`SourceError::ElementCountMismatch`] if the byte length does
    /// not equal the product of `shape` times the element size.
    pub fn from_bytes(
        shape: ArrayShape,
        data_type: DataType,
        bytes: Bytes,
    ) -> Result<Self, SourceError> {
        let expected: u64 = shape.iter().product::<u64>() * data_type.size_bytes() as u64;
        if bytes.len() as u64 != expected {
            return Err(SourceError::ElementCountMismatch {
                expected: expected / data_type.size_bytes() as u64,
                got: bytes.len() as u64 / data_type.size_bytes() as u64,
            });
        }
        Ok(Self {
            shape,
            data_type,
            bytes,
        })
    }

    /// Return the underlying bytes of the whole array.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl ChunkSource for InMemorySource {
    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn read_slab(&mut self, region: &ArraySubset) -> Result<Bytes, SourceError> {
        if !region.inbounds_shape(&self.shape) {
            return Err(SourceError::OutOfBounds {
                region: region.clone(),
                shape: self.shape.clone(),
            });
        }
        let element_size = self.data_type.size_bytes();
        let mut out = vec![0u8; region.num_elements_usize() * element_size];
        copy_region(
            &self.bytes,
            &self.shape,
            region,
            &mut out,
            region.shape(),
            &ArraySubset::new_with_shape(region.shape().to_vec()),
            element_size,
        )?;
        Ok(Bytes::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_source_slab() {
        let mut source =
            InMemorySource::from_elements::<u8>(vec![3, 4], (0..12).collect()).unwrap();
        assert_eq!(source.shape(), &[3, 4]);
        assert_eq!(source.data_type(), DataType::UInt8);
        let slab = source
            .read_slab(&ArraySubset::new_with_ranges(&[1..3, 1..3]))
            .unwrap();
        assert_eq!(slab.as_ref(), &[5, 6, 9, 10]);
        assert!(
            source
                .read_slab(&ArraySubset::new_with_ranges(&[2..4, 0..4]))
                .is_err()
        );
    }

    #[test]
    fn in_memory_source_typed() {
        let mut source =
            InMemorySource::from_elements::<f32>(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(source.data_type(), DataType::Float32);
        let slab = source
            .read_slab(&ArraySubset::new_with_ranges(&[0..2, 0..2]))
            .unwrap();
        assert_eq!(slab.len(), 16);
        assert_eq!(
            bytemuck::cast_slice::<u8, f32>(&slab),
            &[1.0, 2.0, 3.0, 4.0]
        );
    }

    #[test]
    fn in_memory_source_count_mismatch() {
        assert!(matches!(
            InMemorySource::from_elements::<u8>(vec![3, 4], vec![0; 11]),
            Err(SourceError::ElementCountMismatch { .. })
        ));
    }
}
