//! Array subsets.
//!
//! An [`ArraySubset`] represents a rectangular subset of an array or chunk.
//! [`iterators`](crate::iterators) walks subsets in C-contiguous order.

use std::fmt::{Debug, Display};
use std::ops::Range;

use thiserror::Error;

use crate::iterators::Indices;
use crate::{ArrayIndices, ArrayShape};

/// An array subset error.
#[derive(Clone, Debug, Error)]
pub enum ArraySubsetError {
    /// Incompatible dimensionality.
    #[error("incompatible dimensionality {got}, expected {expected}")]
    IncompatibleDimensionality {
        /// The dimensionality supplied.
        got: usize,
        /// The dimensionality expected.
        expected: usize,
    },
    /// Incompatible start and shape.
    #[error("incompatible start {start:?} with shape {shape:?}")]
    IncompatibleStartShape {
        /// The start supplied.
        start: ArrayIndices,
        /// The shape supplied.
        shape: ArrayShape,
    },
    /// Incompatible offset.
    #[error("incompatible offset {offset:?} for subset with start {start:?}")]
    IncompatibleOffset {
        /// The subset start.
        start: ArrayIndices,
        /// The offset supplied.
        offset: ArrayIndices,
    },
}

/// A rectangular subset of an array, stored as a start and a shape.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct ArraySubset {
    start: ArrayIndices,
    shape: ArrayShape,
}

impl Display for ArraySubset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_ranges().fmt(f)
    }
}

impl<T: IntoIterator<Item = Range<u64>>> From<T> for ArraySubset {
    fn from(ranges: T) -> Self {
        let (start, shape) = ranges
            .into_iter()
            .map(|range| (range.start, range.end.saturating_sub(range.start)))
            .unzip();
        Self { start, shape }
    }
}

impl ArraySubset {
    /// Create a new empty array subset.
    #[must_use]
    pub fn new_empty(dimensionality: usize) -> Self {
        Self {
            start: vec![0; dimensionality],
            shape: vec![0; dimensionality],
        }
    }

    /// Create a new array subset from a list of [`Range`]s.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        let (start, shape) = ranges
            .iter()
            .map(|range| (range.start, range.end.saturating_sub(range.start)))
            .unzip();
        Self { start, shape }
    }

    /// Create a new array subset spanning `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset.
    ///
    /// # Errors
    /// Returns [`ArraySubsetError`] if the lengths of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, ArraySubsetError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(ArraySubsetError::IncompatibleStartShape { start, shape })
        }
    }

    /// Bound the array subset to the domain within `end` (exclusive).
    ///
    /// # Errors
    /// Returns [`ArraySubsetError`] if `end` does not match the subset dimensionality.
    pub fn bound(&self, end: &[u64]) -> Result<Self, ArraySubsetError> {
        if end.len() != self.start.len() {
            return Err(ArraySubsetError::IncompatibleDimensionality {
                got: end.len(),
                expected: self.start.len(),
            });
        }
        let start: ArrayIndices = std::iter::zip(&self.start, end)
            .map(|(&a, &b)| std::cmp::min(a, b))
            .collect();
        let shape = itertools::izip!(&start, self.end_exc(), end)
            .map(|(&s, e, &b)| std::cmp::min(e, b).saturating_sub(s))
            .collect();
        Ok(Self { start, shape })
    }

    /// Return the overlapping subset between this subset and `other`.
    ///
    /// # Errors
    /// Returns [`ArraySubsetError`] if the dimensionalities do not match.
    pub fn overlap(&self, other: &Self) -> Result<Self, ArraySubsetError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(ArraySubsetError::IncompatibleDimensionality {
                got: other.dimensionality(),
                expected: self.dimensionality(),
            });
        }
        let start: ArrayIndices = std::iter::zip(&self.start, &other.start)
            .map(|(&a, &b)| std::cmp::max(a, b))
            .collect();
        let shape = itertools::izip!(&start, self.end_exc(), other.end_exc())
            .map(|(&s, e0, e1)| std::cmp::min(e0, e1).saturating_sub(s))
            .collect();
        Ok(Self { start, shape })
    }

    /// Return this subset relative to an `offset`, keeping its shape.
    ///
    /// # Errors
    /// Returns [`ArraySubsetError`] if `offset` exceeds the subset start on any axis
    /// or the dimensionalities do not match.
    pub fn relative_to(&self, offset: &[u64]) -> Result<Self, ArraySubsetError> {
        if offset.len() != self.dimensionality()
            || std::iter::zip(&self.start, offset).any(|(&s, &o)| o > s)
        {
            return Err(ArraySubsetError::IncompatibleOffset {
                start: self.start.clone(),
                offset: offset.to_vec(),
            });
        }
        let start = std::iter::zip(&self.start, offset)
            .map(|(&s, &o)| s - o)
            .collect();
        Ok(Self {
            start,
            shape: self.shape.clone(),
        })
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the exclusive end of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&s, &l)| s + l)
            .collect()
    }

    /// Return the array subset as a list of [`Range`]s.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<u64>> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&s, &l)| s..(s + l))
            .collect()
    }

    /// Returns true if the array subset is empty (i.e. has a zero element in its shape).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|i| i == &0)
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the number of elements of the array subset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of elements of the array subset as a usize.
    ///
    /// # Panics
    /// Panics if the number of elements exceeds [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns true if this subset is within an array of `shape`.
    #[must_use]
    pub fn inbounds_shape(&self, shape: &[u64]) -> bool {
        shape.len() == self.dimensionality()
            && std::iter::zip(self.end_exc(), shape).all(|(end, &dim)| end <= dim)
    }

    /// Returns an iterator over the indices of elements within the subset.
    #[must_use]
    pub fn indices(&self) -> Indices {
        Indices::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset() {
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10, 10]).is_ok());
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10]).is_err());

        let array_subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![10, 10])
            .unwrap()
            .bound(&[5, 5])
            .unwrap();
        assert_eq!(array_subset.shape(), &[5, 5]);
        assert!(
            ArraySubset::new_with_start_shape(vec![0, 0], vec![10, 10])
                .unwrap()
                .bound(&[5, 5, 5])
                .is_err()
        );

        let array_subset0 = ArraySubset::new_with_ranges(&[1..5, 2..6]);
        let array_subset1 = ArraySubset::new_with_ranges(&[3..6, 4..7]);
        assert_eq!(
            array_subset0.overlap(&array_subset1).unwrap(),
            ArraySubset::new_with_ranges(&[3..5, 4..6])
        );
        assert_eq!(
            array_subset0.relative_to(&[1, 1]).unwrap(),
            ArraySubset::new_with_ranges(&[0..4, 1..5])
        );
        assert!(array_subset0.relative_to(&[1, 1, 1]).is_err());
        assert!(array_subset0.relative_to(&[2, 1]).is_err());
        assert!(array_subset0.inbounds_shape(&[10, 10]));
        assert!(!array_subset0.inbounds_shape(&[2, 2]));
        assert!(!array_subset0.inbounds_shape(&[10, 10, 10]));
        assert_eq!(array_subset0.to_ranges(), vec![1..5, 2..6]);
        assert_eq!(array_subset0.num_elements(), 16);

        let disjoint = ArraySubset::new_with_ranges(&[8..9, 0..1]);
        assert!(array_subset0.overlap(&disjoint).unwrap().is_empty());
    }
}
