use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use crate::compression::{CompressionCatalog, Configuration, NamedConfiguration};
use crate::container::{BackendFamily, ContainerReader, IntrospectedDataset};
use crate::dataset::{DatasetLocation, ShapeDtypeDescriptor};
use crate::plan::{PlannerOptions, plan};
use crate::source::SourceGraph;

use super::{
    AmbiguousConfigurationError, CompressionSelection, ConfigurationError, DatasetIOConfiguration,
    DatasetOverride,
};

/// The full write plan for one container: an ordered collection of
/// [`DatasetIOConfiguration`] keyed by location.
///
/// Insertion order preserves discovery order; it matters only for output
/// determinism, not correctness.
pub struct BackendConfiguration {
    family: BackendFamily,
    datasets: Vec<DatasetIOConfiguration>,
    index: HashMap<DatasetLocation, usize>,
    has_dataset_overrides: bool,
}

impl BackendConfiguration {
    fn new(family: BackendFamily) -> Self {
        Self {
            family,
            datasets: Vec::new(),
            index: HashMap::new(),
            has_dataset_overrides: false,
        }
    }

    fn insert(&mut self, configuration: DatasetIOConfiguration) -> Result<(), ConfigurationError> {
        let location = configuration.location().clone();
        if self.index.contains_key(&location) {
            return Err(ConfigurationError::DuplicateLocation(location));
        }
        self.index.insert(location, self.datasets.len());
        self.datasets.push(configuration);
        Ok(())
    }

    /// Build the default configuration for every array-bearing leaf of a
    /// source graph.
    ///
    /// External-reference leaves and attributes never receive a
    /// configuration. Each dataset gets a [`plan`]-derived chunk/buffer
    /// shape and the catalog's default compression method.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the graph cannot be described or
    /// planning fails.
    pub fn build_default(
        family: BackendFamily,
        graph: &SourceGraph,
        catalog: &CompressionCatalog,
        options: &PlannerOptions,
    ) -> Result<Self, ConfigurationError> {
        Self::build_default_from_descriptors(family, graph.descriptors()?, catalog, options)
    }

    /// Build the default configuration for a list of descriptors.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if planning fails or two descriptors
    /// share a location.
    pub fn build_default_from_descriptors(
        family: BackendFamily,
        descriptors: Vec<ShapeDtypeDescriptor>,
        catalog: &CompressionCatalog,
        options: &PlannerOptions,
    ) -> Result<Self, ConfigurationError> {
        let mut configuration = Self::new(family);
        let default_method = catalog.default_method(family).to_string();
        for descriptor in descriptors {
            let chunk_plan = plan(&descriptor, options)?;
            configuration.insert(DatasetIOConfiguration::new_planned(
                descriptor,
                chunk_plan,
                CompressionSelection::Method(NamedConfiguration::new(default_method.clone())),
            )?)?;
        }
        Ok(configuration)
    }

    /// Recover the configuration of an already-written container, verbatim.
    ///
    /// Every entry starts in the [`Existing`](super::ConfigurationState::Existing)
    /// state; it can still be overridden before a re-commit.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if introspection fails or the
    /// recovered metadata violates the invariants.
    pub fn introspect(reader: &dyn ContainerReader) -> Result<Self, ConfigurationError> {
        Self::from_introspected(reader.family(), reader.datasets()?)
    }

    /// Build a configuration from introspected datasets.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the recovered metadata violates
    /// the invariants.
    pub fn from_introspected(
        family: BackendFamily,
        datasets: Vec<IntrospectedDataset>,
    ) -> Result<Self, ConfigurationError> {
        let mut configuration = Self::new(family);
        for dataset in datasets {
            let descriptor = ShapeDtypeDescriptor::new(
                dataset.location,
                dataset.metadata.shape,
                dataset.metadata.data_type,
            )?;
            configuration.insert(DatasetIOConfiguration::new_existing(
                descriptor,
                dataset.metadata.chunk_shape,
                dataset.metadata.compressor,
                dataset.metadata.filters,
            )?)?;
        }
        Ok(configuration)
    }

    /// Return the backend family of the configuration.
    #[must_use]
    pub fn family(&self) -> BackendFamily {
        self.family
    }

    /// Return the number of dataset configurations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Returns true if the configuration holds no datasets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Return the configuration for the dataset at `location`.
    #[must_use]
    pub fn get(&self, location: &DatasetLocation) -> Option<&DatasetIOConfiguration> {
        self.index.get(location).map(|&index| &self.datasets[index])
    }

    /// Iterate the dataset configurations in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &DatasetIOConfiguration> {
        self.datasets.iter()
    }

    /// Returns true if per-dataset overrides were applied.
    #[must_use]
    pub fn has_dataset_overrides(&self) -> bool {
        self.has_dataset_overrides
    }

    /// Apply per-dataset override patches, producing a new configuration.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if an override targets an unknown
    /// location, is ambiguous, or violates the invariants.
    pub fn apply_overrides(
        &self,
        overrides: &BTreeMap<DatasetLocation, DatasetOverride>,
    ) -> Result<Self, ConfigurationError> {
        for location in overrides.keys() {
            if !self.index.contains_key(location) {
                return Err(ConfigurationError::UnknownOverrideLocation(location.clone()));
            }
        }
        let mut next = Self::new(self.family);
        next.has_dataset_overrides = true;
        for configuration in &self.datasets {
            let configuration = match overrides.get(configuration.location()) {
                Some(patch) => configuration.with_override(patch)?,
                None => configuration.clone(),
            };
            next.insert(configuration)?;
        }
        Ok(next)
    }

    /// Rewrite every non-disabled entry to the given compression method,
    /// producing a new configuration.
    ///
    /// Entries whose compression is explicitly disabled are left untouched.
    ///
    /// # Errors
    /// Returns [`AmbiguousConfigurationError`] if `options` are supplied
    /// without a method, or if this configuration was built with per-dataset
    /// overrides (the two are mutually exclusive).
    pub fn with_global_compression(
        &self,
        method: Option<&str>,
        options: Option<Configuration>,
    ) -> Result<Self, ConfigurationError> {
        if self.has_dataset_overrides {
            return Err(AmbiguousConfigurationError::GlobalWithDatasetOverrides.into());
        }
        let Some(method) = method else {
            if options.is_some() {
                return Err(AmbiguousConfigurationError::OptionsWithoutMethod.into());
            }
            return self.try_clone();
        };
        let compression = CompressionSelection::Method(match options {
            Some(options) => NamedConfiguration::new_with_configuration(method, options),
            None => NamedConfiguration::new(method),
        });
        let mut next = Self::new(self.family);
        for configuration in &self.datasets {
            let configuration = if configuration.compression().is_disabled() {
                configuration.clone()
            } else {
                configuration.with_compression(compression.clone())
            };
            next.insert(configuration)?;
        }
        Ok(next)
    }

    fn try_clone(&self) -> Result<Self, ConfigurationError> {
        let mut next = Self::new(self.family);
        next.has_dataset_overrides = self.has_dataset_overrides;
        for configuration in &self.datasets {
            next.insert(configuration.clone())?;
        }
        Ok(next)
    }
}

impl Display for BackendConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "backend configuration ({} family)", self.family)?;
        for configuration in &self.datasets {
            let chunk = configuration
                .chunk_shape()
                .map_or("contiguous".to_string(), |chunk| {
                    format!("{:?}", chunk.iter().map(|c| c.get()).collect::<Vec<_>>())
                });
            let compression = configuration
                .compression()
                .method()
                .map_or("uncompressed".to_string(), |method| {
                    method.name().to_string()
                });
            writeln!(
                f,
                "  {}: shape {:?}, {}, chunk {chunk}, {compression}",
                configuration.location(),
                configuration.descriptor().full_shape(),
                configuration.descriptor().data_type(),
            )?;
        }
        Ok(())
    }
}
