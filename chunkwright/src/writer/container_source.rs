use std::sync::Arc;

use bytes::Bytes;

use chunkwright_grid::{ArrayShape, ArraySubset, copy_region};

use crate::compression::CodecPipeline;
use crate::container::ContainerReader;
use crate::dataset::{DataType, DatasetLocation};
use crate::source::{ChunkSource, SourceError};

/// A [`ChunkSource`] backed by a dataset of an already-written container.
///
/// Slab requests decode the stored chunks overlapping the request and
/// assemble them; this is what lets a repack re-chunk a container without
/// materializing any dataset whole.
pub(crate) struct ContainerDatasetSource {
    reader: Arc<dyn ContainerReader>,
    location: DatasetLocation,
    shape: ArrayShape,
    data_type: DataType,
    stored_chunk_shape: ArrayShape,
    pipeline: CodecPipeline,
}

impl ContainerDatasetSource {
    pub(crate) fn new(
        reader: Arc<dyn ContainerReader>,
        location: DatasetLocation,
        shape: ArrayShape,
        data_type: DataType,
        stored_chunk_shape: Option<Vec<u64>>,
        pipeline: CodecPipeline,
    ) -> Self {
        // An unchunked dataset is a single whole-array chunk at [0; rank].
        let stored_chunk_shape = stored_chunk_shape
            .unwrap_or_else(|| shape.iter().map(|&dim| dim.max(1)).collect());
        Self {
            reader,
            location,
            shape,
            data_type,
            stored_chunk_shape,
            pipeline,
        }
    }
}

impl ChunkSource for ContainerDatasetSource {
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
        let element_size = self.data_type.size_bytes();
        let mut out = vec![0u8; region.num_elements_usize() * element_size];
        if region.is_empty() {
            return Ok(Bytes::from(out));
        }

        // The chunk grid range overlapping the request.
        let chunk_range: Vec<std::ops::Range<u64>> =
            itertools::izip!(region.start(), region.end_exc(), &self.stored_chunk_shape)
                .map(|(&start, end, &chunk)| (start / chunk)..end.div_ceil(chunk))
                .collect();
        for chunk_indices in ArraySubset::new_with_ranges(&chunk_range).indices() {
            let chunk_region = ArraySubset::from(itertools::izip!(
                &chunk_indices,
                &self.stored_chunk_shape,
                &self.shape
            )
            .map(|(&index, &chunk, &full)| (index * chunk)..(index * chunk + chunk).min(full)));
            let raw = self
                .reader
                .read_chunk(&self.location, &chunk_indices)
                .map_err(|err| SourceError::Other(err.to_string()))?;
            let decoded = self
                .pipeline
                .decode(raw.to_vec())
                .map_err(|err| SourceError::Other(err.to_string()))?;
            let expected = chunk_region.num_elements_usize() * element_size;
            if decoded.len() != expected {
                return Err(SourceError::Other(format!(
                    "stored chunk {chunk_indices:?} of {} decoded to {} bytes, expected {expected}",
                    self.location,
                    decoded.len()
                )));
            }
            let overlap = chunk_region
                .overlap(region)
                .map_err(|err| SourceError::Other(err.to_string()))?;
            copy_region(
                &decoded,
                chunk_region.shape(),
                &overlap.relative_to(chunk_region.start()).map_err(|err| {
                    SourceError::Other(err.to_string())
                })?,
                &mut out,
                region.shape(),
                &overlap
                    .relative_to(region.start())
                    .map_err(|err| SourceError::Other(err.to_string()))?,
                element_size,
            )?;
        }
        Ok(Bytes::from(out))
    }
}
