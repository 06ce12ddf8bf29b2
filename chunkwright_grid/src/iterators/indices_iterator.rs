use std::iter::FusedIterator;

use crate::{ArrayIndices, ArraySubset, unravel_index};

/// An iterator over the indices in an array subset.
///
/// Iterates over the last dimension fastest (i.e. C-contiguous order).
/// For example, consider a 4x3 array with element indices
/// ```text
/// (0, 0)  (0, 1)  (0, 2)
/// (1, 0)  (1, 1)  (1, 2)
/// (2, 0)  (2, 1)  (2, 2)
/// (3, 0)  (3, 1)  (3, 2)
/// ```
/// An iterator with an array subset corresponding to the lower right 2x2 region
/// will produce `[(2, 1), (2, 2), (3, 1), (3, 2)]`.
#[derive(Clone)]
pub struct Indices {
    subset: ArraySubset,
}

impl Indices {
    /// Create a new indices struct.
    #[must_use]
    pub fn new(subset: ArraySubset) -> Self {
        Self { subset }
    }

    /// Return the number of indices.
    ///
    /// # Panics
    /// Panics if the number of indices exceeds [`usize::MAX`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.subset.num_elements_usize()
    }

    /// Returns true if the number of indices is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for Indices {
    type Item = ArrayIndices;
    type IntoIter = IndicesIntoIterator;

    fn into_iter(self) -> Self::IntoIter {
        let length = self.subset.num_elements_usize();
        IndicesIntoIterator {
            subset: self.subset,
            range: 0..length,
        }
    }
}

/// Serial indices iterator.
///
/// See [`Indices`].
#[derive(Clone)]
pub struct IndicesIntoIterator {
    subset: ArraySubset,
    range: std::ops::Range<usize>,
}

impl Iterator for IndicesIntoIterator {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.range.start >= self.range.end {
            return None;
        }
        let index = self.range.start as u64;
        self.range.start += 1;
        let mut indices = unravel_index(index, self.subset.shape())?;
        std::iter::zip(indices.iter_mut(), self.subset.start()).for_each(|(i, s)| *i += s);
        Some(indices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let length = self.range.end.saturating_sub(self.range.start);
        (length, Some(length))
    }
}

impl ExactSizeIterator for IndicesIntoIterator {}

impl FusedIterator for IndicesIntoIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_iterator() {
        let indices = Indices::new(ArraySubset::new_with_ranges(&[2..4, 1..3]));
        assert_eq!(indices.len(), 4);
        let mut iter = indices.into_iter();
        assert_eq!(iter.next(), Some(vec![2, 1]));
        assert_eq!(iter.next(), Some(vec![2, 2]));
        assert_eq!(iter.next(), Some(vec![3, 1]));
        assert_eq!(iter.next(), Some(vec![3, 2]));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn indices_iterator_empty() {
        let indices = Indices::new(ArraySubset::new_with_ranges(&[2..2, 1..3]));
        assert!(indices.is_empty());
        assert_eq!(indices.into_iter().next(), None);
    }

    #[test]
    fn indices_iterator_zero_dimensional() {
        // A zero-dimensional subset yields a single empty index.
        let indices = Indices::new(ArraySubset::new_with_shape(vec![]));
        assert_eq!(indices.len(), 1);
        let mut iter = indices.into_iter();
        assert_eq!(iter.next(), Some(vec![]));
        assert_eq!(iter.next(), None);
    }
}
