use thiserror::Error;

use chunkwright_grid::ArrayShape;

use super::{DataType, DatasetLocation};

/// A layout hint for the chunk planner.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AxisHint {
    /// No special axis semantics.
    #[default]
    Generic,
    /// A rank-2 wire-like stream whose second axis holds parallel channels
    /// (e.g. a multi-electrode recording). The planner chunks the channel
    /// axis in groups so partial-channel reads stay efficient.
    ChannelStream,
}

/// An invalid descriptor error.
#[derive(Clone, Debug, Error)]
#[error("dataset descriptor at {location} requires at least one dimension")]
pub struct DescriptorError {
    location: DatasetLocation,
}

/// A pure value type describing one candidate dataset: its full shape, its
/// element type, and its logical location within the container tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShapeDtypeDescriptor {
    location: DatasetLocation,
    full_shape: ArrayShape,
    data_type: DataType,
    axis_hint: AxisHint,
}

impl ShapeDtypeDescriptor {
    /// Create a new descriptor.
    ///
    /// # Errors
    /// Returns [`DescriptorError`] if `full_shape` has no dimensions.
    pub fn new(
        location: DatasetLocation,
        full_shape: ArrayShape,
        data_type: DataType,
    ) -> Result<Self, DescriptorError> {
        if full_shape.is_empty() {
            return Err(DescriptorError { location });
        }
        Ok(Self {
            location,
            full_shape,
            data_type,
            axis_hint: AxisHint::default(),
        })
    }

    /// Set the axis hint of the descriptor.
    #[must_use]
    pub fn with_axis_hint(mut self, axis_hint: AxisHint) -> Self {
        self.axis_hint = axis_hint;
        self
    }

    /// Return the location of the dataset.
    #[must_use]
    pub fn location(&self) -> &DatasetLocation {
        &self.location
    }

    /// Return the full shape of the dataset.
    #[must_use]
    pub fn full_shape(&self) -> &[u64] {
        &self.full_shape
    }

    /// Return the data type of the dataset.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the axis hint of the dataset.
    #[must_use]
    pub fn axis_hint(&self) -> AxisHint {
        self.axis_hint
    }

    /// Return the dimensionality of the dataset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.full_shape.len()
    }

    /// Return the number of elements of the dataset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.full_shape.iter().product()
    }

    /// Return the total size of the dataset in bytes, uncompressed.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.num_elements() * self.data_type.size_bytes() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor() {
        let descriptor = ShapeDtypeDescriptor::new(
            DatasetLocation::new("acquisition/series/data").unwrap(),
            vec![100, 32],
            DataType::Int16,
        )
        .unwrap()
        .with_axis_hint(AxisHint::ChannelStream);
        assert_eq!(descriptor.dimensionality(), 2);
        assert_eq!(descriptor.num_elements(), 3200);
        assert_eq!(descriptor.size_bytes(), 6400);
        assert_eq!(descriptor.axis_hint(), AxisHint::ChannelStream);
    }

    #[test]
    fn descriptor_rank_zero() {
        assert!(
            ShapeDtypeDescriptor::new(
                DatasetLocation::new("a").unwrap(),
                vec![],
                DataType::Float32,
            )
            .is_err()
        );
    }

    #[test]
    fn descriptor_zero_length_axis() {
        let descriptor = ShapeDtypeDescriptor::new(
            DatasetLocation::new("a").unwrap(),
            vec![0, 4],
            DataType::Float32,
        )
        .unwrap();
        assert_eq!(descriptor.num_elements(), 0);
        assert_eq!(descriptor.size_bytes(), 0);
    }
}
