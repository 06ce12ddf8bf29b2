//! Iterators over [`ArraySubset`](crate::ArraySubset) indices.

mod indices_iterator;

pub use indices_iterator::{Indices, IndicesIntoIterator};
