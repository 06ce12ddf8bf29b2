use std::num::NonZeroU64;

use bytes::Bytes;
use log::debug;

use chunkwright_grid::{ChunkShape, ChunkShapeTraits};

use crate::compression::{CodecPipeline, CompressionCatalog};
use crate::config::{BackendConfiguration, DatasetIOConfiguration};
use crate::container::{ContainerSink, DatasetMetadata};
use crate::iterate::BoundedChunkIterator;
use crate::plan::{PlannerOptions, buffer_shape_for_chunk};
use crate::source::{NonDataLeaf, SourceGraph};

use super::{BackendMismatchError, ManifestEntry, WriteError, WriteManifest};

/// The single-chunk shape of a whole array, with zero-length axes clamped to
/// the format minimum of 1.
fn whole_array_chunk(full_shape: &[u64]) -> ChunkShape {
    full_shape
        .iter()
        .map(|&dim| NonZeroU64::new(dim.max(1)).expect("max(1) is non-zero"))
        .collect()
}

/// Streams a source graph into a destination container under a
/// [`BackendConfiguration`].
///
/// The pipeline is synchronous and pull-based: the writer drives the chunk
/// iterator, the iterator drives the source. Memory residency is bounded by
/// one buffer per dataset. Validation (codec availability, family match,
/// source resolution) happens strictly before any byte is written; if writing
/// dataset N of M fails, the datasets already committed remain on disk.
pub struct ContainerWriter<'a> {
    catalog: &'a CompressionCatalog,
    planner_options: PlannerOptions,
}

impl<'a> ContainerWriter<'a> {
    /// Create a new container writer over `catalog`.
    #[must_use]
    pub fn new(catalog: &'a CompressionCatalog) -> Self {
        Self {
            catalog,
            planner_options: PlannerOptions::default(),
        }
    }

    /// Set the planner options used to derive buffer shapes for
    /// configurations that carry none.
    #[must_use]
    pub fn with_planner_options(mut self, planner_options: PlannerOptions) -> Self {
        self.planner_options = planner_options;
        self
    }

    /// Write every configured dataset of `graph` into `sink`, then copy the
    /// non-data leaves byte-for-byte.
    ///
    /// # Errors
    /// Returns a [`WriteError`]. Validation errors surface before any I/O;
    /// I/O errors propagate immediately and are not retried.
    pub fn write(
        &self,
        graph: &mut SourceGraph,
        sink: &mut dyn ContainerSink,
        configuration: &BackendConfiguration,
    ) -> Result<WriteManifest, WriteError> {
        if configuration.family() != sink.family() {
            return Err(BackendMismatchError {
                source_family: configuration.family(),
                destination: sink.family(),
            }
            .into());
        }

        // Resolve every codec and source before the first byte is written.
        let mut pipelines = Vec::with_capacity(configuration.len());
        for dataset in configuration.iter() {
            if !graph.has_dataset(dataset.location()) {
                return Err(WriteError::MissingSource(dataset.location().clone()));
            }
            pipelines.push(self.catalog.build_pipeline(
                configuration.family(),
                dataset.compression().method(),
                dataset.filters(),
                dataset.descriptor().data_type().size_bytes(),
            )?);
        }

        let mut entries = Vec::with_capacity(configuration.len());
        for (dataset, pipeline) in std::iter::zip(configuration.iter(), &pipelines) {
            let committed = dataset.committed();
            entries.push(self.write_dataset(graph, sink, &committed, pipeline)?);
        }

        for (location, leaf) in graph.non_data_leaves() {
            match leaf {
                NonDataLeaf::ExternalReference(target) => {
                    sink.write_external_reference(&location, target)?;
                }
                NonDataLeaf::Attribute(value) => sink.write_attribute(&location, value)?,
            }
        }

        sink.finish()?;
        Ok(WriteManifest { entries })
    }

    fn write_dataset(
        &self,
        graph: &mut SourceGraph,
        sink: &mut dyn ContainerSink,
        dataset: &DatasetIOConfiguration,
        pipeline: &CodecPipeline,
    ) -> Result<ManifestEntry, WriteError> {
        let location = dataset.location().clone();
        let descriptor = dataset.descriptor();
        let full_shape = descriptor.full_shape();
        let element_size = descriptor.data_type().size_bytes() as u64;

        // A configuration without a chunk shape writes the whole array as a
        // single chunk; the metadata stays unchunked so introspection
        // recovers it verbatim.
        let chunk_shape = dataset
            .chunk_shape()
            .cloned()
            .unwrap_or_else(|| whole_array_chunk(full_shape));
        let buffer_shape = match dataset.buffer_shape() {
            Some(buffer_shape) => buffer_shape.clone(),
            None => buffer_shape_for_chunk(
                full_shape,
                &chunk_shape,
                element_size,
                self.planner_options.memory_budget_bytes,
            )?,
        };

        let metadata = DatasetMetadata {
            shape: full_shape.to_vec(),
            data_type: descriptor.data_type(),
            chunk_shape: dataset
                .chunk_shape()
                .map(|chunk_shape| chunk_shape.to_array_shape()),
            compressor: dataset.compression().method().cloned(),
            filters: dataset.filters().map(<[_]>::to_vec),
        };
        sink.begin_dataset(&location, &metadata)?;
        debug!(
            "writing {location}: shape {full_shape:?}, chunk {:?}, buffer {:?}",
            chunk_shape.to_array_shape(),
            buffer_shape.to_array_shape(),
        );

        let source = graph
            .source_mut(&location)
            .ok_or_else(|| WriteError::MissingSource(location.clone()))?;
        let iterator = BoundedChunkIterator::new(source, &chunk_shape, &buffer_shape)?;
        let mut chunks_written = 0u64;
        for chunk in iterator {
            let chunk = chunk?;
            let encoded = pipeline.encode(chunk.bytes.to_vec())?;
            sink.write_chunk(&location, &chunk.chunk_indices, Bytes::from(encoded))?;
            chunks_written += 1;
        }
        debug!("wrote {location}: {chunks_written} chunks");

        Ok(ManifestEntry {
            location,
            full_shape: full_shape.to_vec(),
            data_type: descriptor.data_type(),
            chunk_shape: metadata.chunk_shape,
            compression_method: metadata
                .compressor
                .as_ref()
                .map(|compressor| compressor.name().to_string()),
            compression_options: metadata
                .compressor
                .as_ref()
                .and_then(|compressor| compressor.configuration().cloned()),
        })
    }
}
