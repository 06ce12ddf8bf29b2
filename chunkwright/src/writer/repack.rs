use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::compression::CompressionCatalog;
use crate::config::{BackendConfiguration, DatasetOverride};
use crate::container::{ContainerReader, ContainerSink, NonDataEntry};
use crate::dataset::{AxisHint, DatasetLocation, ShapeDtypeDescriptor};
use crate::plan::PlannerOptions;
use crate::source::SourceGraph;

use super::container_source::ContainerDatasetSource;
use super::{BackendMismatchError, ContainerWriter, RepackError, WriteManifest};

/// Options for [`repack`].
#[derive(Clone, Debug, Default)]
pub struct RepackOptions {
    /// Discard the source container's plan and build a fresh default
    /// configuration for the destination. Required whenever the source and
    /// destination backend families differ.
    pub use_default_backend_configuration: bool,
    /// Per-dataset override patches keyed by location, applied after the
    /// carried or default configuration is resolved.
    pub overrides: Option<BTreeMap<DatasetLocation, DatasetOverride>>,
    /// Planner options for default configurations and derived buffer shapes.
    pub planner_options: PlannerOptions,
}

/// Rewrite an existing container's datasets into `sink`, optionally under a
/// different backend family and a different chunk/compression plan.
///
/// With `use_default_backend_configuration = false` (same family only), every
/// recovered chunk shape and compression setting is carried verbatim; with
/// `true`, the destination gets a freshly planned default configuration.
/// Non-data leaves are copied byte-for-byte either way.
///
/// # Errors
/// Returns [`RepackError::BackendMismatch`] if the families differ without
/// the default configuration, before any I/O; other validation and I/O
/// errors propagate unretried.
pub fn repack(
    reader: Arc<dyn ContainerReader>,
    sink: &mut dyn ContainerSink,
    catalog: &CompressionCatalog,
    options: &RepackOptions,
) -> Result<WriteManifest, RepackError> {
    let source_family = reader.family();
    let destination_family = sink.family();
    if source_family != destination_family && !options.use_default_backend_configuration {
        return Err(BackendMismatchError {
            source_family,
            destination: destination_family,
        }
        .into());
    }
    debug!("repacking a {source_family} container into a {destination_family} destination");

    let introspected = reader.datasets()?;
    let mut configuration = if options.use_default_backend_configuration {
        let descriptors = introspected
            .iter()
            .map(|dataset| {
                ShapeDtypeDescriptor::new(
                    dataset.location.clone(),
                    dataset.metadata.shape.clone(),
                    dataset.metadata.data_type,
                )
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(crate::config::ConfigurationError::from)?;
        BackendConfiguration::build_default_from_descriptors(
            destination_family,
            descriptors,
            catalog,
            &options.planner_options,
        )?
    } else {
        BackendConfiguration::from_introspected(destination_family, introspected.clone())?
    };
    if let Some(overrides) = &options.overrides {
        configuration = configuration.apply_overrides(overrides)?;
    }

    let mut graph = SourceGraph::new();
    for dataset in &introspected {
        let metadata = &dataset.metadata;
        let pipeline = catalog.build_pipeline(
            source_family,
            metadata.compressor.as_ref(),
            metadata.filters.as_deref(),
            metadata.data_type.size_bytes(),
        )?;
        graph.add_dataset(
            &dataset.location,
            ContainerDatasetSource::new(
                reader.clone(),
                dataset.location.clone(),
                metadata.shape.clone(),
                metadata.data_type,
                metadata.chunk_shape.clone(),
                pipeline,
            ),
            AxisHint::Generic,
        )?;
    }
    for (location, entry) in reader.non_data_entries()? {
        match entry {
            NonDataEntry::ExternalReference(target) => {
                graph.add_external_reference(&location, target)?;
            }
            NonDataEntry::Attribute(value) => graph.add_attribute(&location, value)?,
        }
    }

    Ok(ContainerWriter::new(catalog)
        .with_planner_options(options.planner_options)
        .write(&mut graph, sink, &configuration)?)
}
