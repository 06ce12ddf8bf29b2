//! Dataset and backend configuration.
//!
//! A [`DatasetIOConfiguration`] pairs one descriptor with a chunk/buffer plan
//! and a compression choice. A [`BackendConfiguration`] is the ordered
//! collection of dataset configurations for one container: built from
//! defaults, recovered from an existing container, or patched by overrides.

mod backend_configuration;
mod dataset_io_configuration;
mod overrides;

pub use backend_configuration::BackendConfiguration;
pub use dataset_io_configuration::{
    CompressionSelection, ConfigurationState, DatasetIOConfiguration,
};
pub use overrides::DatasetOverride;

use thiserror::Error;

use crate::container::IntrospectError;
use crate::dataset::{DatasetLocation, DescriptorError};
use crate::plan::PlanningError;
use crate::source::GraphError;

/// An ambiguous configuration error.
///
/// Raised when two configuration inputs cannot be reconciled without guessing
/// intent; ambiguity is rejected rather than silently resolved.
#[derive(Clone, Debug, Error)]
pub enum AmbiguousConfigurationError {
    /// Compression options were supplied without a compression method.
    #[error("compression options were supplied without a compression method")]
    OptionsWithoutMethod,
    /// Filter options were supplied without filter methods.
    #[error("filter options were supplied without filter methods")]
    FilterOptionsWithoutMethods,
    /// A global compression override was combined with per-dataset overrides.
    #[error("a global compression override cannot be combined with per-dataset overrides")]
    GlobalWithDatasetOverrides,
}

/// A configuration error.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A shape rank does not match the dataset rank.
    #[error("{what} rank {got} does not match dataset rank {expected} at {location}")]
    RankMismatch {
        /// Which shape is wrong.
        what: &'static str,
        /// The dataset location.
        location: DatasetLocation,
        /// The rank supplied.
        got: usize,
        /// The rank expected.
        expected: usize,
    },
    /// A chunk component exceeds the full shape.
    #[error("chunk component {chunk} exceeds full shape component {full} on axis {axis} at {location}")]
    ChunkExceedsFull {
        /// The dataset location.
        location: DatasetLocation,
        /// The offending axis.
        axis: usize,
        /// The chunk component.
        chunk: u64,
        /// The full shape component.
        full: u64,
    },
    /// A buffer component is below the chunk component.
    #[error("buffer component {buffer} is below chunk component {chunk} on axis {axis} at {location}")]
    BufferBelowChunk {
        /// The dataset location.
        location: DatasetLocation,
        /// The offending axis.
        axis: usize,
        /// The buffer component.
        buffer: u64,
        /// The chunk component.
        chunk: u64,
    },
    /// A buffer component exceeds the full shape.
    #[error("buffer component {buffer} exceeds full shape component {full} on axis {axis} at {location}")]
    BufferExceedsFull {
        /// The dataset location.
        location: DatasetLocation,
        /// The offending axis.
        axis: usize,
        /// The buffer component.
        buffer: u64,
        /// The full shape component.
        full: u64,
    },
    /// A buffer component does not tile the chunk component exactly.
    #[error("buffer component {buffer} is not a multiple of chunk component {chunk} on axis {axis} at {location}")]
    BufferNotChunkMultiple {
        /// The dataset location.
        location: DatasetLocation,
        /// The offending axis.
        axis: usize,
        /// The buffer component.
        buffer: u64,
        /// The chunk component.
        chunk: u64,
    },
    /// A zero-length axis must chunk and buffer as 1.
    #[error("zero-length axis {axis} must chunk and buffer as 1 at {location}")]
    ZeroAxisChunk {
        /// The dataset location.
        location: DatasetLocation,
        /// The offending axis.
        axis: usize,
    },
    /// A chunk or buffer component is zero.
    #[error("{what} component on axis {axis} must be non-zero at {location}")]
    ZeroShapeComponent {
        /// Which shape is wrong.
        what: &'static str,
        /// The dataset location.
        location: DatasetLocation,
        /// The offending axis.
        axis: usize,
    },
    /// A buffer shape was supplied without a chunk shape.
    #[error("a buffer shape requires a chunk shape at {_0}")]
    BufferWithoutChunk(DatasetLocation),
    /// Filter options do not align with filter methods.
    #[error("{options} filter options do not align with {methods} filter methods at {location}")]
    FilterOptionsLengthMismatch {
        /// The dataset location.
        location: DatasetLocation,
        /// The number of filter methods.
        methods: usize,
        /// The number of filter options.
        options: usize,
    },
    /// Two dataset configurations target the same location.
    #[error("two dataset configurations target {_0}")]
    DuplicateLocation(DatasetLocation),
    /// An override targets a dataset absent from the configuration.
    #[error("override targets unknown dataset {_0}")]
    UnknownOverrideLocation(DatasetLocation),
    /// An ambiguous configuration.
    #[error(transparent)]
    Ambiguous(#[from] AmbiguousConfigurationError),
    /// A planning error.
    #[error(transparent)]
    Planning(#[from] PlanningError),
    /// A source graph error.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A descriptor error.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    /// An introspection error.
    #[error(transparent)]
    Introspect(#[from] IntrospectError),
}
