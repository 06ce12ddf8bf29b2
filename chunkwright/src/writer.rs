//! The container writer and repacker.

mod container_source;
mod container_writer;
mod manifest;
mod repack;

pub use container_writer::ContainerWriter;
pub use manifest::{ManifestEntry, WriteManifest};
pub use repack::{RepackOptions, repack};

use thiserror::Error;

use crate::compression::{CodecError, CompressionError};
use crate::config::ConfigurationError;
use crate::container::{BackendFamily, DestinationWriteError, IntrospectError};
use crate::dataset::DatasetLocation;
use crate::iterate::ChunkIterationError;
use crate::plan::PlanningError;
use crate::source::GraphError;

/// A backend family mismatch error.
///
/// Chunk and compression semantics differ between families, so an
/// introspected plan cannot be carried across them; request the default
/// backend configuration instead.
#[derive(Clone, Debug, Error)]
#[error("cannot carry a {source_family} backend plan into a {destination} destination without the default backend configuration")]
pub struct BackendMismatchError {
    /// The source backend family.
    pub source_family: BackendFamily,
    /// The destination backend family.
    pub destination: BackendFamily,
}

/// A container write error.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The configuration and destination backend families differ.
    #[error(transparent)]
    BackendMismatch(#[from] BackendMismatchError),
    /// A compression resolution error.
    #[error(transparent)]
    Compression(#[from] CompressionError),
    /// A configuration error.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// A configured dataset has no source in the graph.
    #[error("no source in the graph for configured dataset {_0}")]
    MissingSource(DatasetLocation),
    /// A chunk iteration error (including short reads).
    #[error(transparent)]
    Iteration(#[from] ChunkIterationError),
    /// A codec error while encoding chunks.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A destination container error.
    #[error(transparent)]
    Destination(#[from] DestinationWriteError),
    /// A planning error while deriving a buffer shape.
    #[error(transparent)]
    Planning(#[from] PlanningError),
}

/// A container repack error.
#[derive(Debug, Error)]
pub enum RepackError {
    /// An introspected plan cannot cross backend families.
    #[error(transparent)]
    BackendMismatch(#[from] BackendMismatchError),
    /// A source container introspection error.
    #[error(transparent)]
    Introspect(#[from] IntrospectError),
    /// A configuration error.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// A compression resolution error.
    #[error(transparent)]
    Compression(#[from] CompressionError),
    /// A source graph error.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A write error.
    #[error(transparent)]
    Write(#[from] WriteError),
}
