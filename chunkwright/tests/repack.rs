#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

use chunkwright::compression::CompressionCatalog;
use chunkwright::config::{BackendConfiguration, DatasetOverride};
use chunkwright::container::classic::{ClassicContainerReader, ClassicContainerWriter};
use chunkwright::container::cloud::{CloudContainerReader, CloudContainerWriter};
use chunkwright::container::{
    BackendFamily, ContainerReader, ContainerSink, DatasetMetadata, NonDataEntry,
};
use chunkwright::dataset::{AxisHint, DataType, DatasetLocation};
use chunkwright::grid::{ArraySubset, copy_region};
use chunkwright::plan::PlannerOptions;
use chunkwright::source::{InMemorySource, SourceGraph};
use chunkwright::storage::store::MemoryStore;
use chunkwright::writer::{ContainerWriter, RepackError, RepackOptions, repack};

/// Decode and reassemble a whole dataset from a container.
fn read_all(reader: &dyn ContainerReader, location: &DatasetLocation) -> Vec<u8> {
    let catalog = CompressionCatalog::standard();
    let dataset = reader
        .datasets()
        .unwrap()
        .into_iter()
        .find(|dataset| &dataset.location == location)
        .unwrap();
    let metadata = dataset.metadata;
    let element_size = metadata.data_type.size_bytes();
    let full_shape = metadata.shape.clone();
    let chunk_shape = metadata
        .chunk_shape
        .clone()
        .unwrap_or_else(|| full_shape.iter().map(|&dim| dim.max(1)).collect());
    let pipeline = catalog
        .build_pipeline(
            reader.family(),
            metadata.compressor.as_ref(),
            metadata.filters.as_deref(),
            element_size,
        )
        .unwrap();

    let total = full_shape.iter().product::<u64>() as usize * element_size;
    let mut out = vec![0u8; total];
    if total == 0 {
        return out;
    }
    let grid_shape: Vec<u64> = std::iter::zip(&full_shape, &chunk_shape)
        .map(|(&full, &chunk)| full.div_ceil(chunk))
        .collect();
    for chunk_indices in ArraySubset::new_with_shape(grid_shape).indices() {
        let ranges: Vec<std::ops::Range<u64>> = chunk_indices
            .iter()
            .enumerate()
            .map(|(axis, &index)| {
                let chunk = chunk_shape[axis];
                (index * chunk)..(index * chunk + chunk).min(full_shape[axis])
            })
            .collect();
        let chunk_region = ArraySubset::new_with_ranges(&ranges);
        let raw = reader.read_chunk(location, &chunk_indices).unwrap();
        let decoded = pipeline.decode(raw.to_vec()).unwrap();
        copy_region(
            &decoded,
            chunk_region.shape(),
            &ArraySubset::new_with_shape(chunk_region.shape().to_vec()),
            &mut out,
            &full_shape,
            &chunk_region,
            element_size,
        )
        .unwrap();
    }
    out
}

fn session_values() -> Vec<i16> {
    (0..5000i16).collect()
}

/// Write a classic container with two datasets, an attribute, and an
/// external reference; return its path.
fn write_classic_fixture(dir: &std::path::Path) -> std::path::PathBuf {
    let catalog = CompressionCatalog::standard();
    let mut graph = SourceGraph::new();
    graph
        .add_dataset(
            "acquisition/series/data",
            InMemorySource::from_elements::<i16>(vec![1250, 4], session_values()).unwrap(),
            AxisHint::Generic,
        )
        .unwrap();
    graph
        .add_dataset(
            "processing/speed/data",
            InMemorySource::from_elements::<f64>(vec![5], vec![0.5, 1.5, 2.5, 3.5, 4.5]).unwrap(),
            AxisHint::Generic,
        )
        .unwrap();
    graph
        .add_attribute("acquisition/series/rate", serde_json::json!(2500.0))
        .unwrap();
    graph
        .add_external_reference("acquisition/video", "/data/run.avi")
        .unwrap();

    let options = PlannerOptions {
        memory_budget_bytes: 4096,
        target_chunk_bytes: 1024,
        channel_group_size: 64,
    };
    let configuration =
        BackendConfiguration::build_default(BackendFamily::Classic, &graph, &catalog, &options)
            .unwrap();
    let path = dir.join("session.cwr");
    let mut sink = ClassicContainerWriter::create(&path).unwrap();
    ContainerWriter::new(&catalog)
        .with_planner_options(options)
        .write(&mut graph, &mut sink, &configuration)
        .unwrap();
    path
}

#[test]
fn repack_same_family_carries_plan_verbatim() {
    let catalog = CompressionCatalog::standard();
    let tmp = tempfile::tempdir().unwrap();
    let source_path = write_classic_fixture(tmp.path());
    let reader: Arc<dyn ContainerReader> =
        Arc::new(ClassicContainerReader::open(&source_path).unwrap());
    let before = BackendConfiguration::introspect(reader.as_ref()).unwrap();

    let destination_path = tmp.path().join("repacked.cwr");
    let mut sink = ClassicContainerWriter::create(&destination_path).unwrap();
    repack(
        reader.clone(),
        &mut sink,
        &catalog,
        &RepackOptions::default(),
    )
    .unwrap();

    let repacked = ClassicContainerReader::open(&destination_path).unwrap();
    let after = BackendConfiguration::introspect(&repacked).unwrap();
    assert_eq!(after.len(), before.len());
    for dataset in before.iter() {
        let carried = after.get(dataset.location()).unwrap();
        assert_eq!(carried.chunk_shape(), dataset.chunk_shape());
        assert_eq!(carried.compression(), dataset.compression());
        assert_eq!(carried.filters(), dataset.filters());
    }

    // Data and non-data leaves survive.
    let series = DatasetLocation::new("acquisition/series/data").unwrap();
    assert_eq!(read_all(&repacked, &series), read_all(reader.as_ref(), &series));
    assert_eq!(
        repacked.non_data_entries().unwrap().len(),
        reader.non_data_entries().unwrap().len()
    );
}

#[test]
fn repack_across_families_requires_default_configuration() {
    let catalog = CompressionCatalog::standard();
    let tmp = tempfile::tempdir().unwrap();
    let source_path = write_classic_fixture(tmp.path());
    let reader: Arc<dyn ContainerReader> =
        Arc::new(ClassicContainerReader::open(&source_path).unwrap());

    let store = Arc::new(MemoryStore::new());
    let mut sink = CloudContainerWriter::new(store.clone());
    let err = repack(
        reader.clone(),
        &mut sink,
        &catalog,
        &RepackOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RepackError::BackendMismatch(_)));

    // With the default configuration the cross-family repack succeeds.
    let mut sink = CloudContainerWriter::new(store.clone());
    let manifest = repack(
        reader.clone(),
        &mut sink,
        &catalog,
        &RepackOptions {
            use_default_backend_configuration: true,
            ..RepackOptions::default()
        },
    )
    .unwrap();
    assert_eq!(manifest.entries.len(), 2);

    let cloud = CloudContainerReader::new(store);
    let series = DatasetLocation::new("acquisition/series/data").unwrap();
    assert_eq!(read_all(&cloud, &series), read_all(reader.as_ref(), &series));
    let rate = DatasetLocation::new("acquisition/series/rate").unwrap();
    assert!(cloud.non_data_entries().unwrap().iter().any(|(location, entry)| {
        location == &rate && entry == &NonDataEntry::Attribute(serde_json::json!(2500.0))
    }));
}

#[test]
fn repack_overrides_refine_the_default_plan() {
    let catalog = CompressionCatalog::standard();
    let tmp = tempfile::tempdir().unwrap();
    let source_path = write_classic_fixture(tmp.path());
    let reader: Arc<dyn ContainerReader> =
        Arc::new(ClassicContainerReader::open(&source_path).unwrap());

    let series = DatasetLocation::new("acquisition/series/data").unwrap();
    let mut overrides = BTreeMap::new();
    overrides.insert(
        series.clone(),
        DatasetOverride {
            chunk_shape: Some(vec![625, 4]),
            compression_method: Some(Some("zstd".to_string())),
            ..DatasetOverride::default()
        },
    );
    let store = Arc::new(MemoryStore::new());
    let mut sink = CloudContainerWriter::new(store.clone());
    let manifest = repack(
        reader.clone(),
        &mut sink,
        &catalog,
        &RepackOptions {
            use_default_backend_configuration: true,
            overrides: Some(overrides),
            ..RepackOptions::default()
        },
    )
    .unwrap();
    let entry = manifest.entry(&series).unwrap();
    assert_eq!(entry.chunk_shape, Some(vec![625, 4]));
    assert_eq!(entry.compression_method.as_deref(), Some("zstd"));

    let cloud = CloudContainerReader::new(store);
    assert_eq!(read_all(&cloud, &series), read_all(reader.as_ref(), &series));
}

#[test]
fn repack_preserves_unchunked_uncompressed_datasets() {
    // Craft a cloud container holding a contiguous, uncompressed dataset
    // (written by some other tool), then carry it through a repack.
    let values: Vec<u8> = (0..32).collect();
    let location = DatasetLocation::new("reference/lookup").unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut sink = CloudContainerWriter::new(store.clone());
    sink.begin_dataset(
        &location,
        &DatasetMetadata {
            shape: vec![32],
            data_type: DataType::UInt8,
            chunk_shape: None,
            compressor: None,
            filters: None,
        },
    )
    .unwrap();
    sink.write_chunk(&location, &[0], Bytes::from(values.clone()))
        .unwrap();
    sink.finish().unwrap();

    let catalog = CompressionCatalog::standard();
    let reader: Arc<dyn ContainerReader> = Arc::new(CloudContainerReader::new(store));
    let recovered = BackendConfiguration::introspect(reader.as_ref()).unwrap();
    let dataset = recovered.get(&location).unwrap();
    assert!(dataset.chunk_shape().is_none());
    assert!(dataset.compression().is_disabled());

    let destination = Arc::new(MemoryStore::new());
    let mut sink = CloudContainerWriter::new(destination.clone());
    repack(
        reader,
        &mut sink,
        &catalog,
        &RepackOptions::default(),
    )
    .unwrap();

    let repacked = CloudContainerReader::new(destination);
    let carried = BackendConfiguration::introspect(&repacked).unwrap();
    let dataset = carried.get(&location).unwrap();
    assert!(dataset.chunk_shape().is_none());
    assert!(dataset.compression().is_disabled());
    assert_eq!(read_all(&repacked, &location), values);
}

#[test]
fn repack_cloud_to_classic_with_defaults() {
    let catalog = CompressionCatalog::standard();
    let mut graph = SourceGraph::new();
    graph
        .add_dataset(
            "processing/dff/data",
            InMemorySource::from_elements::<f32>(vec![3, 3], vec![0.25; 9]).unwrap(),
            AxisHint::Generic,
        )
        .unwrap();
    let configuration = BackendConfiguration::build_default(
        BackendFamily::Cloud,
        &graph,
        &catalog,
        &PlannerOptions::default(),
    )
    .unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut sink = CloudContainerWriter::new(store.clone());
    ContainerWriter::new(&catalog)
        .write(&mut graph, &mut sink, &configuration)
        .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("repacked.cwr");
    let reader: Arc<dyn ContainerReader> = Arc::new(CloudContainerReader::new(store));
    let mut sink = ClassicContainerWriter::create(&path).unwrap();
    repack(
        reader.clone(),
        &mut sink,
        &catalog,
        &RepackOptions {
            use_default_backend_configuration: true,
            ..RepackOptions::default()
        },
    )
    .unwrap();

    let classic = ClassicContainerReader::open(&path).unwrap();
    let location = DatasetLocation::new("processing/dff/data").unwrap();
    assert_eq!(
        read_all(&classic, &location),
        read_all(reader.as_ref(), &location)
    );
}
