use bytes::{Bytes, BytesMut};

use chunkwright_grid::{ArrayShape, ArraySubset};

use crate::dataset::DataType;

use super::{ChunkSource, SourceError};

/// A strictly-forward source pulling whole rows from a stream of byte blocks.
///
/// Stands in for a device reader that cannot be randomly seeked: blocks
/// arrive in row-major order with arbitrary boundaries, and a consumed offset
/// is never re-delivered. Requested regions must advance monotonically along
/// the outermost axis and span the full extent of every inner axis.
///
/// If the stream ends before the promised shape is delivered, `read_slab`
/// returns the bytes it has; the chunk iterator turns the short slab into a
/// short-read failure.
pub struct RowStreamSource<I> {
    shape: ArrayShape,
    data_type: DataType,
    blocks: I,
    next_row: u64,
    carry: BytesMut,
}

impl<I> RowStreamSource<I>
where
    I: Iterator<Item = Result<Bytes, SourceError>> + Send,
{
    /// Create a new row stream source over `blocks`.
    pub fn new(shape: ArrayShape, data_type: DataType, blocks: I) -> Self {
        Self {
            shape,
            data_type,
            blocks,
            next_row: 0,
            carry: BytesMut::new(),
        }
    }

    fn row_stride(&self) -> usize {
        self.shape[1..].iter().product::<u64>() as usize * self.data_type.size_bytes()
    }

    /// Move up to `want` bytes from the carry buffer and the block stream
    /// into `out`. Stops early if the stream is exhausted.
    fn pull_bytes(&mut self, want: usize, out: &mut Vec<u8>) -> Result<(), SourceError> {
        let from_carry = want.min(self.carry.len());
        out.extend_from_slice(&self.carry.split_to(from_carry));
        let mut remaining = want - from_carry;
        while remaining > 0 {
            let Some(block) = self.blocks.next() else {
                return Ok(());
            };
            let block = block?;
            if block.len() <= remaining {
                out.extend_from_slice(&block);
                remaining -= block.len();
            } else {
                out.extend_from_slice(&block[..remaining]);
                self.carry.extend_from_slice(&block[remaining..]);
                remaining = 0;
            }
        }
        Ok(())
    }

    fn skip_rows(&mut self, rows: u64) -> Result<(), SourceError> {
        let mut scratch = Vec::new();
        self.pull_bytes(rows as usize * self.row_stride(), &mut scratch)?;
        Ok(())
    }
}

impl<I> ChunkSource for RowStreamSource<I>
where
    I: Iterator<Item = Result<Bytes, SourceError>> + Send,
{
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
        let spans_rows = region.start()[1..].iter().all(|&start| start == 0)
            && region.shape()[1..] == self.shape[1..];
        if !spans_rows {
            return Err(SourceError::PartialRowPull {
                region: region.clone(),
            });
        }
        if region.is_empty() {
            return Ok(Bytes::new());
        }

        let start_row = region.start()[0];
        let n_rows = region.shape()[0];
        if start_row < self.next_row {
            return Err(SourceError::NonMonotonicPull {
                requested_row: start_row,
                next_row: self.next_row,
            });
        }
        if start_row > self.next_row {
            self.skip_rows(start_row - self.next_row)?;
        }
        let mut out = Vec::new();
        self.pull_bytes(n_rows as usize * self.row_stride(), &mut out)?;
        self.next_row = start_row + n_rows;
        Ok(Bytes::from(out))
    }
}
