//! The chunk planner: pure functions computing chunk and buffer shapes for a
//! dataset under a memory budget and I/O heuristics.

mod chunk_planner;

pub use chunk_planner::{ChunkPlan, PlannerOptions, PlanningError, buffer_shape_for_chunk, plan};
