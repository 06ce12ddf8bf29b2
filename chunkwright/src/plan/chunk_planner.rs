use std::num::NonZeroU64;

use thiserror::Error;

use chunkwright_grid::{ArrayShape, ChunkShape};

use crate::dataset::{AxisHint, ShapeDtypeDescriptor};

/// Tunable defaults for the chunk planner.
///
/// The numeric defaults are empirically chosen and not load-bearing for
/// correctness; callers with unusual access patterns should tune them.
#[derive(Clone, Copy, Debug)]
pub struct PlannerOptions {
    /// The hard ceiling on bytes resident in memory per dataset while writing.
    pub memory_budget_bytes: u64,
    /// The target size of one uncompressed chunk in bytes.
    pub target_chunk_bytes: u64,
    /// The channel-axis group size for [`AxisHint::ChannelStream`] datasets.
    pub channel_group_size: u64,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            memory_budget_bytes: 1 << 30,
            target_chunk_bytes: 1 << 20,
            channel_group_size: 64,
        }
    }
}

/// A chunk and buffer shape pair computed by [`plan`].
///
/// Invariants, per axis: `chunk_shape <= buffer_shape`, and `buffer_shape` is
/// an exact multiple of `chunk_shape` wherever it is smaller than the full
/// shape.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChunkPlan {
    /// The shape of one contiguous chunk.
    pub chunk_shape: ChunkShape,
    /// The shape of the in-memory buffer materialized per iteration.
    pub buffer_shape: ChunkShape,
}

/// A chunk planning error.
#[derive(Clone, Debug, Error)]
pub enum PlanningError {
    /// The memory budget cannot hold a single element.
    #[error("memory budget of {budget} bytes cannot hold a single {element_size} byte element")]
    InvalidMemoryBudget {
        /// The memory budget in bytes.
        budget: u64,
        /// The element size in bytes.
        element_size: u64,
    },
    /// The target chunk byte size is zero.
    #[error("the target chunk byte size must be non-zero")]
    InvalidChunkTarget,
}

fn nonzero_axis(dim: u64) -> NonZeroU64 {
    // Zero-length axes chunk as 1, the format minimum.
    NonZeroU64::new(dim.max(1)).expect("max(1) is non-zero")
}

/// Compute a chunk shape and a buffer shape for `descriptor`.
///
/// If the dataset fits `options.memory_budget_bytes` whole, the chunk and
/// buffer shapes both equal the full shape. Otherwise the chunk shape
/// approaches `options.target_chunk_bytes` by holding the outermost
/// (iteration) axis smallest and growing inner axes, and the buffer shape is
/// the largest exact per-axis multiple of the chunk shape that fits the
/// budget. Rank-2 [`AxisHint::ChannelStream`] datasets chunk the channel axis
/// in groups of `options.channel_group_size` instead of the byte-budget
/// split.
///
/// Deterministic for identical inputs.
///
/// # Errors
/// Returns a [`PlanningError`] if the memory budget cannot hold one element
/// or the chunk byte target is zero.
pub fn plan(
    descriptor: &ShapeDtypeDescriptor,
    options: &PlannerOptions,
) -> Result<ChunkPlan, PlanningError> {
    let element_size = descriptor.data_type().size_bytes() as u64;
    if element_size > options.memory_budget_bytes {
        return Err(PlanningError::InvalidMemoryBudget {
            budget: options.memory_budget_bytes,
            element_size,
        });
    }
    if options.target_chunk_bytes == 0 {
        return Err(PlanningError::InvalidChunkTarget);
    }

    let full_shape = descriptor.full_shape();
    if descriptor.size_bytes() <= options.memory_budget_bytes {
        // The whole array fits the budget: a single buffer and a single
        // (format-compliant) chunk.
        let shape: ChunkShape = full_shape.iter().copied().map(nonzero_axis).collect();
        log::trace!(
            "planned {} whole-array: chunk = buffer = {full_shape:?}",
            descriptor.location()
        );
        return Ok(ChunkPlan {
            chunk_shape: shape.clone(),
            buffer_shape: shape,
        });
    }

    // The array exceeds the budget, so every axis is non-zero from here on.
    // A chunk larger than the budget could never be buffered, so the byte
    // target is clamped to the budget.
    let target_bytes = options.target_chunk_bytes.min(options.memory_budget_bytes);
    let target_elements = (target_bytes / element_size).max(1);
    let chunk_shape = compute_chunk_shape(
        full_shape,
        target_elements,
        descriptor.axis_hint(),
        options.channel_group_size,
    );
    let buffer_shape = grow_buffer(
        full_shape,
        &chunk_shape,
        options.memory_budget_bytes / element_size,
    );
    log::trace!(
        "planned {}: chunk {chunk_shape:?}, buffer {buffer_shape:?}",
        descriptor.location()
    );
    Ok(ChunkPlan {
        chunk_shape,
        buffer_shape,
    })
}

fn compute_chunk_shape(
    full_shape: &[u64],
    target_elements: u64,
    axis_hint: AxisHint,
    channel_group_size: u64,
) -> ChunkShape {
    let rank = full_shape.len();
    let mut chunk: ArrayShape = full_shape.to_vec();

    if axis_hint == AxisHint::ChannelStream && rank == 2 {
        // Channel-grouping rule: fix the channel axis, size the frame axis
        // from the remaining element target.
        chunk[1] = channel_group_size.min(full_shape[1]).max(1);
    } else {
        // Shrink inner axes until they fit the element target, halving the
        // largest inner axis each round (the lowest axis wins ties).
        loop {
            let inner: u64 = chunk[1..].iter().product();
            if inner <= target_elements || rank == 1 {
                break;
            }
            // max_by_key returns the last maximum, so iterating high-to-low
            // makes the lowest axis win ties.
            let largest = (1..rank)
                .rev()
                .max_by_key(|&axis| chunk[axis])
                .expect("rank > 1");
            if chunk[largest] == 1 {
                break;
            }
            chunk[largest] = chunk[largest].div_ceil(2);
        }
    }

    let inner: u64 = chunk[1..].iter().product();
    chunk[0] = (target_elements / inner).clamp(1, full_shape[0]);
    chunk.into_iter().map(nonzero_axis).collect()
}

/// Compute the largest exact per-axis multiple of `chunk_shape` that holds at
/// most `budget_elements` elements, capped at `full_shape`. Axes grow
/// outermost-first so buffers stay contiguous along the iteration axis.
fn grow_buffer(full_shape: &[u64], chunk_shape: &ChunkShape, budget_elements: u64) -> ChunkShape {
    let mut buffer: ArrayShape = chunk_shape.iter().map(|c| c.get()).collect();
    for axis in 0..full_shape.len() {
        let chunk = chunk_shape[axis].get();
        let others: u64 = buffer
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != axis)
            .map(|(_, &b)| b)
            .product();
        let multiplier = (budget_elements / (others * chunk)).max(1);
        buffer[axis] = if multiplier * chunk >= full_shape[axis] {
            full_shape[axis]
        } else {
            multiplier * chunk
        };
    }
    buffer.into_iter().map(nonzero_axis).collect()
}

/// Derive a buffer shape for an already-fixed chunk shape under a memory
/// budget, for configurations recovered from disk that carry no buffer shape.
///
/// # Errors
/// Returns a [`PlanningError`] if the memory budget cannot hold one element.
pub fn buffer_shape_for_chunk(
    full_shape: &[u64],
    chunk_shape: &ChunkShape,
    element_size: u64,
    memory_budget_bytes: u64,
) -> Result<ChunkShape, PlanningError> {
    if element_size > memory_budget_bytes {
        return Err(PlanningError::InvalidMemoryBudget {
            budget: memory_budget_bytes,
            element_size,
        });
    }
    Ok(grow_buffer(
        full_shape,
        chunk_shape,
        memory_budget_bytes / element_size,
    ))
}
