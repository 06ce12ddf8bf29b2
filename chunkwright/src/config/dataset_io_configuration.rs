use std::num::NonZeroU64;

use chunkwright_grid::ChunkShape;

use crate::compression::NamedConfiguration;
use crate::dataset::{DatasetLocation, ShapeDtypeDescriptor};
use crate::plan::ChunkPlan;

use super::{AmbiguousConfigurationError, ConfigurationError, DatasetOverride};

/// The lifecycle state of a [`DatasetIOConfiguration`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigurationState {
    /// Freshly planned from a bare descriptor.
    Planned,
    /// Recovered verbatim from an existing container.
    Existing,
    /// One or more user edits applied on top of a planned or recovered
    /// configuration.
    Overridden,
    /// Handed to a writer; terminal.
    Committed,
}

/// The compression choice of a dataset configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum CompressionSelection {
    /// Compress with the named method.
    Method(NamedConfiguration),
    /// Store uncompressed, by deliberate choice (or recovered as such from
    /// disk). A global compression pass never touches a disabled entry.
    Disabled,
}

impl CompressionSelection {
    /// Return the named method, or [`None`] if compression is disabled.
    #[must_use]
    pub fn method(&self) -> Option<&NamedConfiguration> {
        match self {
            Self::Method(method) => Some(method),
            Self::Disabled => None,
        }
    }

    /// Returns true if compression is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

/// The I/O configuration of one dataset: a descriptor, a chunk/buffer plan,
/// and a compression choice.
///
/// Immutable once handed to a writer; every change produces a new instance.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetIOConfiguration {
    descriptor: ShapeDtypeDescriptor,
    chunk_shape: Option<ChunkShape>,
    buffer_shape: Option<ChunkShape>,
    compression: CompressionSelection,
    filters: Option<Vec<NamedConfiguration>>,
    state: ConfigurationState,
}

impl DatasetIOConfiguration {
    /// Create a planned configuration from a descriptor and a chunk plan.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the plan violates the axis-wise
    /// invariants.
    pub fn new_planned(
        descriptor: ShapeDtypeDescriptor,
        plan: ChunkPlan,
        compression: CompressionSelection,
    ) -> Result<Self, ConfigurationError> {
        let configuration = Self {
            descriptor,
            chunk_shape: Some(plan.chunk_shape),
            buffer_shape: Some(plan.buffer_shape),
            compression,
            filters: None,
            state: ConfigurationState::Planned,
        };
        configuration.validate()?;
        Ok(configuration)
    }

    /// Create a configuration recovered verbatim from an existing container.
    ///
    /// `chunk_shape = None` means the dataset was written whole-array with no
    /// chunking metadata. The buffer shape is a write-time concern and is not
    /// container metadata; a writer derives one under its memory budget.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the recovered chunk shape violates
    /// the axis-wise invariants.
    pub fn new_existing(
        descriptor: ShapeDtypeDescriptor,
        chunk_shape: Option<Vec<u64>>,
        compressor: Option<NamedConfiguration>,
        filters: Option<Vec<NamedConfiguration>>,
    ) -> Result<Self, ConfigurationError> {
        let chunk_shape = chunk_shape
            .map(|shape| to_chunk_shape("chunk shape", descriptor.location(), &shape))
            .transpose()?;
        let configuration = Self {
            descriptor,
            chunk_shape,
            buffer_shape: None,
            compression: match compressor {
                Some(compressor) => CompressionSelection::Method(compressor),
                None => CompressionSelection::Disabled,
            },
            filters,
            state: ConfigurationState::Existing,
        };
        configuration.validate()?;
        Ok(configuration)
    }

    /// Return the descriptor of the dataset.
    #[must_use]
    pub fn descriptor(&self) -> &ShapeDtypeDescriptor {
        &self.descriptor
    }

    /// Return the location of the dataset.
    #[must_use]
    pub fn location(&self) -> &DatasetLocation {
        self.descriptor.location()
    }

    /// Return the chunk shape, or [`None`] for a whole-array unchunked
    /// dataset recovered from disk.
    #[must_use]
    pub fn chunk_shape(&self) -> Option<&ChunkShape> {
        self.chunk_shape.as_ref()
    }

    /// Return the buffer shape, or [`None`] if a writer should derive one.
    #[must_use]
    pub fn buffer_shape(&self) -> Option<&ChunkShape> {
        self.buffer_shape.as_ref()
    }

    /// Return the compression selection.
    #[must_use]
    pub fn compression(&self) -> &CompressionSelection {
        &self.compression
    }

    /// Return the filter chain, if any (cloud-object family only).
    #[must_use]
    pub fn filters(&self) -> Option<&[NamedConfiguration]> {
        self.filters.as_deref()
    }

    /// Return the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConfigurationState {
        self.state
    }

    /// Apply a patch, producing a new configuration in the
    /// [`ConfigurationState::Overridden`] state.
    ///
    /// Overriding the chunk shape without a buffer shape clears the buffer
    /// shape, leaving the writer to derive a compatible one.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the patch is ambiguous or the
    /// patched configuration violates the axis-wise invariants.
    pub fn with_override(&self, patch: &DatasetOverride) -> Result<Self, ConfigurationError> {
        let location = self.location().clone();
        let mut next = self.clone();
        next.state = ConfigurationState::Overridden;

        if let Some(chunk_shape) = &patch.chunk_shape {
            next.chunk_shape = Some(to_chunk_shape("chunk shape", &location, chunk_shape)?);
            if patch.buffer_shape.is_none() {
                next.buffer_shape = None;
            }
        }
        if let Some(buffer_shape) = &patch.buffer_shape {
            next.buffer_shape = Some(to_chunk_shape("buffer shape", &location, buffer_shape)?);
        }

        match (&patch.compression_method, &patch.compression_options) {
            (None, None) => {}
            (None | Some(None), Some(_)) => {
                return Err(AmbiguousConfigurationError::OptionsWithoutMethod.into());
            }
            (Some(None), None) => next.compression = CompressionSelection::Disabled,
            (Some(Some(method)), None) => {
                next.compression =
                    CompressionSelection::Method(NamedConfiguration::new(method.clone()));
            }
            (Some(Some(method)), Some(options)) => {
                next.compression = CompressionSelection::Method(
                    NamedConfiguration::new_with_configuration(method.clone(), options.clone()),
                );
            }
        }

        match (&patch.filter_methods, &patch.filter_options) {
            (None, None) => {}
            (None, Some(_)) => {
                return Err(AmbiguousConfigurationError::FilterOptionsWithoutMethods.into());
            }
            (Some(methods), options) => {
                if let Some(options) = options {
                    if options.len() != methods.len() {
                        return Err(ConfigurationError::FilterOptionsLengthMismatch {
                            location,
                            methods: methods.len(),
                            options: options.len(),
                        });
                    }
                }
                next.filters = if methods.is_empty() {
                    None
                } else {
                    Some(
                        methods
                            .iter()
                            .enumerate()
                            .map(|(i, method)| {
                                match options.as_ref().and_then(|options| options[i].clone()) {
                                    Some(options) => NamedConfiguration::new_with_configuration(
                                        method.clone(),
                                        options,
                                    ),
                                    None => NamedConfiguration::new(method.clone()),
                                }
                            })
                            .collect(),
                    )
                };
            }
        }

        next.validate()?;
        Ok(next)
    }

    /// Replace the compression selection, producing a new configuration in
    /// the [`ConfigurationState::Overridden`] state.
    pub(crate) fn with_compression(&self, compression: CompressionSelection) -> Self {
        let mut next = self.clone();
        next.compression = compression;
        next.state = ConfigurationState::Overridden;
        next
    }

    /// Mark the configuration committed.
    pub(crate) fn committed(&self) -> Self {
        let mut next = self.clone();
        next.state = ConfigurationState::Committed;
        next
    }

    /// Check the axis-wise invariants: `chunk <= buffer <= full` per axis,
    /// exact chunk tiling wherever the buffer is below the full shape, and
    /// chunk/buffer of 1 on zero-length axes.
    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        let location = self.location();
        let full_shape = self.descriptor.full_shape();
        let rank = full_shape.len();

        if self.chunk_shape.is_none() && self.buffer_shape.is_some() {
            return Err(ConfigurationError::BufferWithoutChunk(location.clone()));
        }
        let Some(chunk_shape) = &self.chunk_shape else {
            return Ok(());
        };
        if chunk_shape.len() != rank {
            return Err(ConfigurationError::RankMismatch {
                what: "chunk shape",
                location: location.clone(),
                got: chunk_shape.len(),
                expected: rank,
            });
        }
        for (axis, (&chunk, &full)) in std::iter::zip(chunk_shape, full_shape).enumerate() {
            if full == 0 {
                if chunk.get() != 1 {
                    return Err(ConfigurationError::ZeroAxisChunk {
                        location: location.clone(),
                        axis,
                    });
                }
            } else if chunk.get() > full {
                return Err(ConfigurationError::ChunkExceedsFull {
                    location: location.clone(),
                    axis,
                    chunk: chunk.get(),
                    full,
                });
            }
        }

        let Some(buffer_shape) = &self.buffer_shape else {
            return Ok(());
        };
        if buffer_shape.len() != rank {
            return Err(ConfigurationError::RankMismatch {
                what: "buffer shape",
                location: location.clone(),
                got: buffer_shape.len(),
                expected: rank,
            });
        }
        for (axis, ((&buffer, &chunk), &full)) in
            std::iter::zip(std::iter::zip(buffer_shape, chunk_shape), full_shape).enumerate()
        {
            let (buffer, chunk) = (buffer.get(), chunk.get());
            if buffer < chunk {
                return Err(ConfigurationError::BufferBelowChunk {
                    location: location.clone(),
                    axis,
                    buffer,
                    chunk,
                });
            }
            if full == 0 {
                if buffer != 1 {
                    return Err(ConfigurationError::ZeroAxisChunk {
                        location: location.clone(),
                        axis,
                    });
                }
            } else {
                if buffer > full {
                    return Err(ConfigurationError::BufferExceedsFull {
                        location: location.clone(),
                        axis,
                        buffer,
                        full,
                    });
                }
                if buffer < full && buffer % chunk != 0 {
                    return Err(ConfigurationError::BufferNotChunkMultiple {
                        location: location.clone(),
                        axis,
                        buffer,
                        chunk,
                    });
                }
            }
        }
        Ok(())
    }
}

fn to_chunk_shape(
    what: &'static str,
    location: &DatasetLocation,
    shape: &[u64],
) -> Result<ChunkShape, ConfigurationError> {
    shape
        .iter()
        .enumerate()
        .map(|(axis, &dim)| {
            NonZeroU64::new(dim).ok_or_else(|| ConfigurationError::ZeroShapeComponent {
                what,
                location: location.clone(),
                axis,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Configuration;
    use crate::dataset::DataType;
    use crate::plan::{PlannerOptions, plan};

    fn descriptor(shape: Vec<u64>) -> ShapeDtypeDescriptor {
        ShapeDtypeDescriptor::new(
            DatasetLocation::new("test/data").unwrap(),
            shape,
            DataType::Float32,
        )
        .unwrap()
    }

    fn planned(shape: Vec<u64>) -> DatasetIOConfiguration {
        let descriptor = descriptor(shape);
        let plan = plan(&descriptor, &PlannerOptions::default()).unwrap();
        DatasetIOConfiguration::new_planned(
            descriptor,
            plan,
            CompressionSelection::Method(NamedConfiguration::new("gzip")),
        )
        .unwrap()
    }

    #[test]
    fn planned_state_and_invariants() {
        let configuration = planned(vec![2, 3]);
        assert_eq!(configuration.state(), ConfigurationState::Planned);
        assert_eq!(
            configuration.chunk_shape().unwrap(),
            &[NonZeroU64::new(2).unwrap(), NonZeroU64::new(3).unwrap()]
        );
        assert!(!configuration.compression().is_disabled());
    }

    #[test]
    fn existing_unchunked() {
        let configuration =
            DatasetIOConfiguration::new_existing(descriptor(vec![16]), None, None, None).unwrap();
        assert_eq!(configuration.state(), ConfigurationState::Existing);
        assert!(configuration.chunk_shape().is_none());
        assert!(configuration.compression().is_disabled());
    }

    #[test]
    fn existing_rejects_zero_chunk() {
        assert!(matches!(
            DatasetIOConfiguration::new_existing(
                descriptor(vec![16]),
                Some(vec![0]),
                None,
                None,
            ),
            Err(ConfigurationError::ZeroShapeComponent { .. })
        ));
    }

    #[test]
    fn override_chunk_clears_buffer() {
        let configuration = planned(vec![100, 100]);
        let patch = DatasetOverride {
            chunk_shape: Some(vec![10, 100]),
            ..DatasetOverride::default()
        };
        let next = configuration.with_override(&patch).unwrap();
        assert_eq!(next.state(), ConfigurationState::Overridden);
        assert!(next.buffer_shape().is_none());
    }

    #[test]
    fn override_options_without_method_is_ambiguous() {
        let configuration = planned(vec![4]);
        let mut options = Configuration::new();
        options.insert("level".to_string(), 5.into());
        let patch = DatasetOverride {
            compression_options: Some(options),
            ..DatasetOverride::default()
        };
        assert!(matches!(
            configuration.with_override(&patch),
            Err(ConfigurationError::Ambiguous(
                AmbiguousConfigurationError::OptionsWithoutMethod
            ))
        ));
    }

    #[test]
    fn override_explicit_disable() {
        let configuration = planned(vec![4]);
        let patch = DatasetOverride {
            compression_method: Some(None),
            ..DatasetOverride::default()
        };
        let next = configuration.with_override(&patch).unwrap();
        assert!(next.compression().is_disabled());
    }

    #[test]
    fn invariant_violations_rejected() {
        let descriptor = descriptor(vec![100, 100]);
        // Buffer not a multiple of chunk on a partial axis.
        let plan = ChunkPlan {
            chunk_shape: vec![NonZeroU64::new(10).unwrap(), NonZeroU64::new(100).unwrap()],
            buffer_shape: vec![NonZeroU64::new(25).unwrap(), NonZeroU64::new(100).unwrap()],
        };
        assert!(matches!(
            DatasetIOConfiguration::new_planned(
                descriptor,
                plan,
                CompressionSelection::Disabled,
            ),
            Err(ConfigurationError::BufferNotChunkMultiple { .. })
        ));
    }

    #[test]
    fn zero_axis_rules() {
        let descriptor = descriptor(vec![0, 4]);
        let good = ChunkPlan {
            chunk_shape: vec![NonZeroU64::new(1).unwrap(), NonZeroU64::new(4).unwrap()],
            buffer_shape: vec![NonZeroU64::new(1).unwrap(), NonZeroU64::new(4).unwrap()],
        };
        assert!(DatasetIOConfiguration::new_planned(
            descriptor.clone(),
            good,
            CompressionSelection::Disabled,
        )
        .is_ok());
        let bad = ChunkPlan {
            chunk_shape: vec![NonZeroU64::new(2).unwrap(), NonZeroU64::new(4).unwrap()],
            buffer_shape: vec![NonZeroU64::new(2).unwrap(), NonZeroU64::new(4).unwrap()],
        };
        assert!(matches!(
            DatasetIOConfiguration::new_planned(descriptor, bad, CompressionSelection::Disabled),
            Err(ConfigurationError::ZeroAxisChunk { .. })
        ));
    }
}
