//! The bounded chunk iterator.
//!
//! [`BoundedChunkIterator`] walks a source array as buffer-sized blocks in
//! row-major order, cutting each resident block into chunk-sized sub-blocks.
//! At most one buffer's worth of source data is resident at a time, and the
//! chunks within a buffer are emitted contiguously. Stopping between chunks
//! has no side effects; a fresh iterator always starts from the first chunk.

use bytes::Bytes;
use thiserror::Error;

use chunkwright_grid::iterators::IndicesIntoIterator;
use chunkwright_grid::{
    ArrayIndices, ArrayShape, ArraySubset, ArraySubsetError, ChunkShape, ChunkShapeTraits,
    RegionCopyError, copy_region,
};

use crate::source::{ChunkSource, SourceError};

/// A source under-delivery error.
#[derive(Clone, Debug, Error)]
#[error("source under-delivered at offset {offset:?}: expected {expected} bytes, got {got}")]
pub struct ShortReadError {
    /// The offset of the buffer block at which the shortfall was detected.
    pub offset: ArrayIndices,
    /// The expected byte count of the block.
    pub expected: usize,
    /// The delivered byte count.
    pub got: usize,
}

/// A chunk iteration error.
#[derive(Debug, Error)]
pub enum ChunkIterationError {
    /// The source yielded fewer elements than its full shape promises.
    #[error(transparent)]
    ShortRead(#[from] ShortReadError),
    /// A source read error.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// A region copy error.
    #[error(transparent)]
    RegionCopy(#[from] RegionCopyError),
    /// An array subset error.
    #[error(transparent)]
    Subset(#[from] ArraySubsetError),
    /// The plan rank does not match the source rank.
    #[error("plan rank {plan} does not match source rank {source_rank}")]
    PlanRankMismatch {
        /// The rank of the chunk/buffer plan.
        plan: usize,
        /// The rank of the source.
        source_rank: usize,
    },
}

/// One emitted chunk: its grid indices, its absolute element offset, its
/// (possibly edge-clipped) shape, and its raw bytes.
#[derive(Clone, Debug)]
pub struct ChunkBlock {
    /// The chunk indices within the chunk grid.
    pub chunk_indices: ArrayIndices,
    /// The absolute element offset of the chunk within the full array.
    pub offset: ArrayIndices,
    /// The shape of the chunk, clipped at the array edge.
    pub shape: ArrayShape,
    /// The C-contiguous chunk bytes.
    pub bytes: Bytes,
}

struct BufferBlock {
    region: ArraySubset,
    bytes: Bytes,
    chunks: IndicesIntoIterator,
}

/// A lazy, finite sequence of rectangular chunks covering a source array.
///
/// Not restartable mid-flight, but constructing a fresh iterator always
/// starts from the first chunk. Each pull may block on the underlying
/// source's I/O; the iterator performs no buffering beyond the current
/// buffer block.
pub struct BoundedChunkIterator<'a> {
    source: &'a mut dyn ChunkSource,
    full_shape: ArrayShape,
    chunk_shape: ArrayShape,
    buffer_shape: ArrayShape,
    element_size: usize,
    buffer_grid: IndicesIntoIterator,
    current: Option<BufferBlock>,
    failed: bool,
}

impl<'a> BoundedChunkIterator<'a> {
    /// Create a new bounded chunk iterator over `source`.
    ///
    /// A zero-element source iterates empty.
    ///
    /// # Errors
    /// Returns [`ChunkIterationError::PlanRankMismatch`] if the plan rank
    /// does not match the source rank.
    pub fn new(
        source: &'a mut dyn ChunkSource,
        chunk_shape: &ChunkShape,
        buffer_shape: &ChunkShape,
    ) -> Result<Self, ChunkIterationError> {
        let full_shape = source.shape().to_vec();
        if chunk_shape.len() != full_shape.len() || buffer_shape.len() != full_shape.len() {
            return Err(ChunkIterationError::PlanRankMismatch {
                plan: chunk_shape.len(),
                source_rank: full_shape.len(),
            });
        }
        let buffer_shape = buffer_shape.to_array_shape();
        let buffer_grid_shape: ArrayShape = if full_shape.contains(&0) {
            vec![0; full_shape.len()]
        } else {
            std::iter::zip(&full_shape, &buffer_shape)
                .map(|(&full, &buffer)| full.div_ceil(buffer))
                .collect()
        };
        let element_size = source.data_type().size_bytes();
        Ok(Self {
            source,
            full_shape,
            chunk_shape: chunk_shape.to_array_shape(),
            buffer_shape,
            element_size,
            buffer_grid: ArraySubset::new_with_shape(buffer_grid_shape)
                .indices()
                .into_iter(),
            current: None,
            failed: false,
        })
    }

    /// Pull the next buffer block into memory, or return `None` at the end.
    fn advance_buffer(&mut self) -> Option<Result<(), ChunkIterationError>> {
        let grid_indices = self.buffer_grid.next()?;
        let start: ArrayIndices = std::iter::zip(&grid_indices, &self.buffer_shape)
            .map(|(&g, &buffer)| g * buffer)
            .collect();
        let shape: ArrayShape = itertools::izip!(&start, &self.buffer_shape, &self.full_shape)
            .map(|(&start, &buffer, &full)| buffer.min(full - start))
            .collect();
        let region = ArraySubset::new_with_start_shape(start, shape).expect("matching rank");

        let bytes = match self.source.read_slab(&region) {
            Ok(bytes) => bytes,
            Err(err) => return Some(Err(err.into())),
        };
        let expected = region.num_elements_usize() * self.element_size;
        if bytes.len() < expected {
            return Some(Err(ShortReadError {
                offset: region.start().to_vec(),
                expected,
                got: bytes.len(),
            }
            .into()));
        }
        if bytes.len() > expected {
            return Some(Err(SourceError::Other(format!(
                "source over-delivered at offset {:?}: expected {expected} bytes, got {}",
                region.start(),
                bytes.len()
            ))
            .into()));
        }

        let chunk_grid_shape: ArrayShape = std::iter::zip(region.shape(), &self.chunk_shape)
            .map(|(&extent, &chunk)| extent.div_ceil(chunk))
            .collect();
        log::trace!(
            "buffered block at {:?} ({} chunks)",
            region.start(),
            chunk_grid_shape.iter().product::<u64>()
        );
        self.current = Some(BufferBlock {
            region,
            bytes,
            chunks: ArraySubset::new_with_shape(chunk_grid_shape)
                .indices()
                .into_iter(),
        });
        Some(Ok(()))
    }

    /// Cut one chunk out of the resident buffer block.
    fn cut_chunk(&mut self, chunk_rel: &[u64]) -> Result<ChunkBlock, ChunkIterationError> {
        let block = self.current.as_ref().expect("a resident buffer block");
        let offset: ArrayIndices = itertools::izip!(block.region.start(), chunk_rel, &self.chunk_shape)
            .map(|(&block_start, &rel, &chunk)| block_start + rel * chunk)
            .collect();
        let block_end = block.region.end_exc();
        let shape: ArrayShape = itertools::izip!(&offset, &self.chunk_shape, &block_end)
            .map(|(&offset, &chunk, &end)| chunk.min(end - offset))
            .collect();
        let chunk_indices: ArrayIndices = std::iter::zip(&offset, &self.chunk_shape)
            .map(|(&offset, &chunk)| offset / chunk)
            .collect();

        let absolute = ArraySubset::new_with_start_shape(offset.clone(), shape.clone())
            .expect("matching rank");
        let within_block = absolute.relative_to(block.region.start())?;
        let mut bytes =
            vec![0u8; shape.iter().product::<u64>() as usize * self.element_size];
        copy_region(
            &block.bytes,
            block.region.shape(),
            &within_block,
            &mut bytes,
            &shape,
            &ArraySubset::new_with_shape(shape.clone()),
            self.element_size,
        )?;
        Ok(ChunkBlock {
            chunk_indices,
            offset,
            shape,
            bytes: Bytes::from(bytes),
        })
    }
}

impl Iterator for BoundedChunkIterator<'_> {
    type Item = Result<ChunkBlock, ChunkIterationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(block) = &mut self.current {
                if let Some(chunk_rel) = block.chunks.next() {
                    match self.cut_chunk(&chunk_rel) {
                        Ok(chunk) => return Some(Ok(chunk)),
                        Err(err) => {
                            self.failed = true;
                            return Some(Err(err));
                        }
                    }
                }
                self.current = None;
            }
            match self.advance_buffer() {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    self.failed = true;
                    return Some(Err(err));
                }
                None => return None,
            }
        }
    }
}
