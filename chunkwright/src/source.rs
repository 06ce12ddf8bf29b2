//! Source arrays and streams.
//!
//! Every source of dataset bytes, from an in-memory array to a lazy device
//! stream, exposes the same capability surface: a stable shape and element
//! type, plus a pull method returning a requested slab. The planner and
//! iterator never switch on concrete source types.

mod element;
mod graph;
mod memory;
mod stream;

pub use element::Element;
pub use graph::{GraphError, NonDataLeaf, SourceGraph};
pub use memory::InMemorySource;
pub use stream::RowStreamSource;

use bytes::Bytes;
use thiserror::Error;

use chunkwright_grid::{ArrayShape, ArraySubset, RegionCopyError};

use crate::dataset::DataType;

/// A source read error.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The requested region is out-of-bounds of the source shape.
    #[error("region {region} is out-of-bounds of source shape {shape:?}")]
    OutOfBounds {
        /// The requested region.
        region: ArraySubset,
        /// The source shape.
        shape: ArrayShape,
    },
    /// The element count does not match the source shape.
    #[error("expected {expected} elements for the source shape, got {got}")]
    ElementCountMismatch {
        /// The expected element count.
        expected: u64,
        /// The supplied element count.
        got: u64,
    },
    /// A strictly-forward source was asked to re-deliver consumed rows.
    #[error("forward-only source cannot re-deliver row {requested_row}, already at row {next_row}")]
    NonMonotonicPull {
        /// The first row of the rejected request.
        requested_row: u64,
        /// The next row the source can deliver.
        next_row: u64,
    },
    /// A strictly-forward source was asked for a region not spanning whole rows.
    #[error("forward-only source requires regions spanning whole rows, got {region}")]
    PartialRowPull {
        /// The rejected region.
        region: ArraySubset,
    },
    /// A region copy error.
    #[error(transparent)]
    RegionCopy(#[from] RegionCopyError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

/// Traits for a source of dataset bytes.
///
/// A source yields C-contiguous little-slab bytes on demand. Random-access
/// sources accept any in-bounds region; strictly-forward sources (device
/// readers) accept only monotonically advancing whole-row regions and never
/// re-deliver a consumed offset.
pub trait ChunkSource: Send {
    /// The full shape of the source.
    fn shape(&self) -> &[u64];

    /// The element type of the source.
    fn data_type(&self) -> DataType;

    /// Pull the bytes of `region`, C-contiguous.
    ///
    /// A source that cannot deliver the whole region (e.g. a stream that
    /// ended early) returns the bytes it has; the caller treats a short slab
    /// as a short read.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the region is out-of-bounds, violates the
    /// source's pull discipline, or the underlying read fails.
    fn read_slab(&mut self, region: &ArraySubset) -> Result<Bytes, SourceError>;
}
