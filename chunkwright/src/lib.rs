//! `chunkwright` converts heterogeneous large-array sources into
//! standardized, chunked, compressed, self-describing containers.
//!
//! The crate is the dataset backend configuration and chunked I/O engine of a
//! conversion pipeline: for every large array destined for on-disk storage it
//! decides what shape of contiguous chunk to use, how much data to buffer in
//! memory before a flush, and which compression codec to apply, then safely
//! iterates an out-of-core source to produce those chunks without ever
//! materializing the whole array. It can also introspect an already-written
//! container to recover its chunking/compression plan verbatim, and repack a
//! container into a different plan or a different backend family.
//!
//! Two backend families are supported: a classic chunked-binary single-file
//! format and a cloud-object chunked multi-file format (see [`container`]).
//!
//! The subsystem enforces one central resource contract: memory residency per
//! active dataset is bounded by the buffer shape times the element size,
//! however large the source array is.
//!
//! ## Example
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use chunkwright::compression::CompressionCatalog;
//! use chunkwright::config::BackendConfiguration;
//! use chunkwright::container::BackendFamily;
//! use chunkwright::container::cloud::{CloudContainerReader, CloudContainerWriter};
//! use chunkwright::dataset::AxisHint;
//! use chunkwright::plan::PlannerOptions;
//! use chunkwright::source::{InMemorySource, SourceGraph};
//! use chunkwright::storage::store::MemoryStore;
//! use chunkwright::writer::ContainerWriter;
//!
//! let mut graph = SourceGraph::new();
//! graph.add_dataset(
//!     "acquisition/series/data",
//!     InMemorySource::from_elements::<f32>(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?,
//!     AxisHint::Generic,
//! )?;
//!
//! let catalog = CompressionCatalog::standard();
//! let configuration = BackendConfiguration::build_default(
//!     BackendFamily::Cloud,
//!     &graph,
//!     &catalog,
//!     &PlannerOptions::default(),
//! )?;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut sink = CloudContainerWriter::new(store.clone());
//! let manifest = ContainerWriter::new(&catalog).write(&mut graph, &mut sink, &configuration)?;
//! assert_eq!(manifest.entries[0].chunk_shape, Some(vec![2, 3]));
//! assert_eq!(manifest.entries[0].compression_method.as_deref(), Some("gzip"));
//!
//! let recovered = BackendConfiguration::introspect(&CloudContainerReader::new(store))?;
//! assert_eq!(recovered.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//! `chunkwright` logs through the [`log`] crate; enable a logging
//! implementation to capture per-dataset write progress.
//!
//! ## Licence
//! `chunkwright` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

pub mod compression;
pub mod config;
pub mod container;
pub mod dataset;
pub mod iterate;
pub mod plan;
pub mod source;
pub mod writer;

/// Re-export of [`chunkwright_grid`]: shapes, subsets, and iterators.
pub use chunkwright_grid as grid;

/// Re-export of [`chunkwright_storage`]: the store API for the cloud-object
/// family.
pub use chunkwright_storage as storage;

pub use config::{BackendConfiguration, DatasetIOConfiguration, DatasetOverride};
pub use container::BackendFamily;
pub use dataset::{DataType, DatasetLocation, ShapeDtypeDescriptor};
pub use iterate::BoundedChunkIterator;
pub use plan::{ChunkPlan, PlannerOptions};
pub use writer::{ContainerWriter, RepackOptions, WriteManifest, repack};
