//! Array shapes, rectangular subsets, and row-major iterators for the
//! [`chunkwright`](https://docs.rs/chunkwright/latest/chunkwright/index.html) crate.
//!
//! The types in this crate are pure bookkeeping: they describe rectangular
//! regions of N-dimensional arrays and how to walk them in C-contiguous
//! (last-axis-fastest) order. No I/O happens here.
//!
//! ## Licence
//! `chunkwright_grid` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

mod array_subset;
pub use array_subset::{ArraySubset, ArraySubsetError};

mod chunk_shape_traits;
pub use chunk_shape_traits::ChunkShapeTraits;

pub mod iterators;

mod region_copy;
pub use region_copy::{RegionCopyError, copy_region};

use std::num::NonZeroU64;

/// An array shape. Dimensions may be zero.
pub type ArrayShape = Vec<u64>;

/// A chunk shape. Dimensions must be non-zero.
pub type ChunkShape = Vec<NonZeroU64>;

/// An ND index to an element in an array or chunk.
pub type ArrayIndices = Vec<u64>;

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, thiserror::Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// Ravel ND indices to a linearised index.
///
/// Returns [`None`] if any `indices` are out-of-bounds of `shape`.
#[must_use]
pub fn ravel_indices(indices: &[u64], shape: &[u64]) -> Option<u64> {
    let mut index: u64 = 0;
    let mut count = 1;
    for (i, s) in std::iter::zip(indices, shape).rev() {
        if i >= s {
            return None;
        }
        index += i * count;
        count *= s;
    }
    Some(index)
}

/// Unravel a linearised index to ND indices.
///
/// Returns [`None`] if `index` is out-of-bounds of `shape`.
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> Option<ArrayIndices> {
    let total_size: u64 = shape
        .iter()
        .try_fold(1u64, |acc, &dim| acc.checked_mul(dim))?;
    if index >= total_size {
        return None;
    }
    let mut indices = vec![0; shape.len()];
    for (out, &dim) in std::iter::zip(indices.iter_mut(), shape).rev() {
        *out = index % dim;
        index /= dim;
    }
    Some(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ravel_unravel() {
        assert_eq!(ravel_indices(&[1, 2], &[3, 4]), Some(6));
        assert_eq!(ravel_indices(&[1, 4], &[3, 4]), None);
        assert_eq!(unravel_index(6, &[3, 4]), Some(vec![1, 2]));
        assert_eq!(unravel_index(12, &[3, 4]), None);
        assert_eq!(unravel_index(0, &[]), Some(vec![]));
    }
}
