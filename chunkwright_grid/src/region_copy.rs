//! Rectangular region copies between C-contiguous byte buffers.

use thiserror::Error;

use crate::{ArrayShape, ArraySubset, ravel_indices};

/// A region copy error.
#[derive(Clone, Debug, Error)]
pub enum RegionCopyError {
    /// The source and destination regions have different shapes.
    #[error("source region shape {src:?} does not match destination region shape {dst:?}")]
    RegionShapeMismatch {
        /// The source region shape.
        src: ArrayShape,
        /// The destination region shape.
        dst: ArrayShape,
    },
    /// A region is out-of-bounds of its array shape.
    #[error("region {region} is out-of-bounds of array shape {shape:?}")]
    RegionOutOfBounds {
        /// The offending region.
        region: ArraySubset,
        /// The array shape.
        shape: ArrayShape,
    },
    /// A buffer length does not match its array shape.
    #[error("buffer of {len} bytes does not hold an array of shape {shape:?} with {element_size} byte elements")]
    IncompatibleBufferLength {
        /// The buffer length in bytes.
        len: usize,
        /// The array shape.
        shape: ArrayShape,
        /// The element size in bytes.
        element_size: usize,
    },
}

fn checked_buffer_len(
    buf_len: usize,
    shape: &[u64],
    element_size: usize,
) -> Result<(), RegionCopyError> {
    let expected = shape.iter().product::<u64>() as usize * element_size;
    if buf_len == expected {
        Ok(())
    } else {
        Err(RegionCopyError::IncompatibleBufferLength {
            len: buf_len,
            shape: shape.to_vec(),
            element_size,
        })
    }
}

/// Copy a rectangular region between two C-contiguous byte buffers.
///
/// `src_region` (within an array of `src_shape`) is copied to `dst_region`
/// (within an array of `dst_shape`). The regions must have identical shapes.
/// Rows along the last axis are contiguous in both buffers, so the copy
/// proceeds one row segment at a time.
///
/// # Errors
/// Returns a [`RegionCopyError`] if the region shapes differ, a region is
/// out-of-bounds, or a buffer length does not match its shape.
pub fn copy_region(
    src: &[u8],
    src_shape: &[u64],
    src_region: &ArraySubset,
    dst: &mut [u8],
    dst_shape: &[u64],
    dst_region: &ArraySubset,
    element_size: usize,
) -> Result<(), RegionCopyError> {
    if src_region.shape() != dst_region.shape() {
        return Err(RegionCopyError::RegionShapeMismatch {
            src: src_region.shape().to_vec(),
            dst: dst_region.shape().to_vec(),
        });
    }
    if !src_region.inbounds_shape(src_shape) {
        return Err(RegionCopyError::RegionOutOfBounds {
            region: src_region.clone(),
            shape: src_shape.to_vec(),
        });
    }
    if !dst_region.inbounds_shape(dst_shape) {
        return Err(RegionCopyError::RegionOutOfBounds {
            region: dst_region.clone(),
            shape: dst_shape.to_vec(),
        });
    }
    checked_buffer_len(src.len(), src_shape, element_size)?;
    checked_buffer_len(dst.len(), dst_shape, element_size)?;
    if src_region.is_empty() {
        return Ok(());
    }

    let region_shape = src_region.shape();
    let rank = region_shape.len();
    if rank == 0 {
        dst[..element_size].copy_from_slice(&src[..element_size]);
        return Ok(());
    }
    let row_len = region_shape[rank - 1] as usize * element_size;
    let leading = ArraySubset::new_with_shape(region_shape[..rank - 1].to_vec());
    let mut src_indices = vec![0; rank];
    let mut dst_indices = vec![0; rank];
    for rel in leading.indices() {
        for (axis, &r) in rel.iter().enumerate() {
            src_indices[axis] = src_region.start()[axis] + r;
            dst_indices[axis] = dst_region.start()[axis] + r;
        }
        src_indices[rank - 1] = src_region.start()[rank - 1];
        dst_indices[rank - 1] = dst_region.start()[rank - 1];
        let src_offset =
            ravel_indices(&src_indices, src_shape).expect("inbounds") as usize * element_size;
        let dst_offset =
            ravel_indices(&dst_indices, dst_shape).expect("inbounds") as usize * element_size;
        dst[dst_offset..dst_offset + row_len]
            .copy_from_slice(&src[src_offset..src_offset + row_len]);
    }
    Ok(())
}
