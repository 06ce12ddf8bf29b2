use thiserror::Error;

use crate::dataset::{
    AxisHint, DataType, DatasetLocation, DatasetLocationError, DescriptorError,
    ShapeDtypeDescriptor,
};

use super::ChunkSource;

/// A source graph error.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An invalid location.
    #[error(transparent)]
    InvalidLocation(#[from] DatasetLocationError),
    /// A node already exists at the location.
    #[error("a node already exists at {_0}")]
    DuplicateNode(DatasetLocation),
    /// An intermediate path segment is a leaf, not a group.
    #[error("{_0} is a leaf and cannot hold children")]
    NotAGroup(DatasetLocation),
    /// A ragged index dataset is not 1-D `uint64`.
    #[error("ragged index at {location} must be 1-D uint64, got {got_rank}-D {got_data_type}")]
    InvalidRaggedIndex {
        /// The values dataset location.
        location: DatasetLocation,
        /// The rank of the supplied index.
        got_rank: usize,
        /// The data type of the supplied index.
        got_data_type: DataType,
    },
    /// An invalid descriptor.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

enum SourceNode {
    Group(Vec<(String, SourceNode)>),
    Dataset {
        source: Box<dyn ChunkSource>,
        axis_hint: AxisHint,
    },
    Ragged {
        values: Box<dyn ChunkSource>,
        index: Box<dyn ChunkSource>,
    },
    ExternalReference(String),
    Attribute(serde_json::Value),
}

/// A non-data leaf of a source graph.
#[derive(Clone, Debug, PartialEq)]
pub enum NonDataLeaf<'a> {
    /// A pointer to data kept outside the container.
    ExternalReference(&'a str),
    /// A small JSON attribute.
    Attribute(&'a serde_json::Value),
}

/// An ordered tree of groups and leaves handed to the writer.
///
/// Leaves are datasets (array-bearing, configured and chunked), ragged
/// composites (a values dataset plus an implicit `<location>_index` index
/// dataset), external references, and JSON attributes. Discovery order is
/// insertion order.
#[derive(Default)]
pub struct SourceGraph {
    root: Vec<(String, SourceNode)>,
}

impl SourceGraph {
    /// Create a new empty source graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an array-bearing dataset leaf at `location`.
    ///
    /// # Errors
    /// Returns a [`GraphError`] if the location is invalid or collides with
    /// an existing node.
    pub fn add_dataset(
        &mut self,
        location: impl AsRef<str>,
        source: impl ChunkSource + 'static,
        axis_hint: AxisHint,
    ) -> Result<(), GraphError> {
        let location = DatasetLocation::new(location.as_ref())?;
        self.insert(
            &location,
            SourceNode::Dataset {
                source: Box::new(source),
                axis_hint,
            },
        )
    }

    /// Add a ragged composite: a values dataset at `location` plus its 1-D
    /// `uint64` index dataset, surfaced at `<location>_index`.
    ///
    /// # Errors
    /// Returns a [`GraphError`] if the index is not 1-D `uint64`, or the
    /// location is invalid or collides with an existing node.
    pub fn add_ragged(
        &mut self,
        location: impl AsRef<str>,
        values: impl ChunkSource + 'static,
        index: impl ChunkSource + 'static,
    ) -> Result<(), GraphError> {
        let location = DatasetLocation::new(location.as_ref())?;
        if index.shape().len() != 1 || index.data_type() != DataType::UInt64 {
            return Err(GraphError::InvalidRaggedIndex {
                location,
                got_rank: index.shape().len(),
                got_data_type: index.data_type(),
            });
        }
        self.insert(
            &location,
            SourceNode::Ragged {
                values: Box::new(values),
                index: Box::new(index),
            },
        )
    }

    /// Add an external-reference leaf at `location`.
    ///
    /// External references never receive a dataset configuration; the writer
    /// copies them byte-for-byte.
    ///
    /// # Errors
    /// Returns a [`GraphError`] if the location is invalid or collides with
    /// an existing node.
    pub fn add_external_reference(
        &mut self,
        location: impl AsRef<str>,
        target: impl Into<String>,
    ) -> Result<(), GraphError> {
        let location = DatasetLocation::new(location.as_ref())?;
        self.insert(&location, SourceNode::ExternalReference(target.into()))
    }

    /// Add a JSON attribute leaf at `location`.
    ///
    /// # Errors
    /// Returns a [`GraphError`] if the location is invalid or collides with
    /// an existing node.
    pub fn add_attribute(
        &mut self,
        location: impl AsRef<str>,
        value: serde_json::Value,
    ) -> Result<(), GraphError> {
        let location = DatasetLocation::new(location.as_ref())?;
        self.insert(&location, SourceNode::Attribute(value))
    }

    fn insert(
        &mut self,
        location: &DatasetLocation,
        node: SourceNode,
    ) -> Result<(), GraphError> {
        let segments: Vec<&str> = location.as_str().split('/').collect();
        let mut children = &mut self.root;
        for segment in &segments[..segments.len() - 1] {
            let position = children.iter().position(|(name, _)| name == segment);
            let index = match position {
                Some(index) => {
                    if !matches!(children[index].1, SourceNode::Group(_)) {
                        return Err(GraphError::NotAGroup(location.clone()));
                    }
                    index
                }
                None => {
                    children.push(((*segment).to_string(), SourceNode::Group(Vec::new())));
                    children.len() - 1
                }
            };
            let SourceNode::Group(next) = &mut children[index].1 else {
                unreachable!("checked to be a group");
            };
            children = next;
        }
        let leaf = segments[segments.len() - 1];
        if children.iter().any(|(name, _)| name == leaf) {
            return Err(GraphError::DuplicateNode(location.clone()));
        }
        children.push((leaf.to_string(), node));
        Ok(())
    }

    fn find(&self, location: &DatasetLocation) -> Option<&SourceNode> {
        let mut children = &self.root;
        let segments: Vec<&str> = location.as_str().split('/').collect();
        for (depth, segment) in segments.iter().enumerate() {
            let (_, node) = children.iter().find(|(name, _)| name == segment)?;
            if depth == segments.len() - 1 {
                return Some(node);
            }
            let SourceNode::Group(next) = node else {
                return None;
            };
            children = next;
        }
        None
    }

    fn find_mut(&mut self, location: &DatasetLocation) -> Option<&mut SourceNode> {
        let mut children = &mut self.root;
        let segments: Vec<&str> = location.as_str().split('/').collect();
        for (depth, segment) in segments.iter().enumerate() {
            let index = children.iter().position(|(name, _)| name == segment)?;
            if depth == segments.len() - 1 {
                return Some(&mut children[index].1);
            }
            let SourceNode::Group(next) = &mut children[index].1 else {
                return None;
            };
            children = next;
        }
        None
    }

    /// Returns true if a dataset (or ragged values/index dataset) exists at
    /// `location`.
    #[must_use]
    pub fn has_dataset(&self, location: &DatasetLocation) -> bool {
        match self.find(location) {
            Some(SourceNode::Dataset { .. } | SourceNode::Ragged { .. }) => true,
            Some(_) => false,
            None => self.ragged_for_index(location).is_some(),
        }
    }

    /// The ragged values location whose implicit index dataset lives at
    /// `location`, if any.
    fn ragged_for_index(&self, location: &DatasetLocation) -> Option<DatasetLocation> {
        let values = DatasetLocation::new(location.as_str().strip_suffix("_index")?).ok()?;
        matches!(self.find(&values), Some(SourceNode::Ragged { .. })).then_some(values)
    }

    /// Resolve the source for the dataset at `location`.
    ///
    /// Ragged composites resolve at both their values location and their
    /// `<location>_index` index location.
    pub fn source_mut(&mut self, location: &DatasetLocation) -> Option<&mut dyn ChunkSource> {
        if self.find(location).is_some() {
            return match self.find_mut(location) {
                Some(SourceNode::Dataset { source, .. }) => Some(source.as_mut()),
                Some(SourceNode::Ragged { values, .. }) => Some(values.as_mut()),
                _ => None,
            };
        }
        let values_location = self.ragged_for_index(location)?;
        match self.find_mut(&values_location) {
            Some(SourceNode::Ragged { index, .. }) => Some(index.as_mut()),
            _ => None,
        }
    }

    /// Return descriptors for every array-bearing leaf, in discovery order.
    ///
    /// External references and attributes never receive a descriptor.
    ///
    /// # Errors
    /// Returns a [`GraphError`] if a source shape cannot be described.
    pub fn descriptors(&self) -> Result<Vec<ShapeDtypeDescriptor>, GraphError> {
        fn walk(
            children: &[(String, SourceNode)],
            prefix: &str,
            out: &mut Vec<ShapeDtypeDescriptor>,
        ) -> Result<(), GraphError> {
            for (name, node) in children {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };
                match node {
                    SourceNode::Group(next) => walk(next, &path, out)?,
                    SourceNode::Dataset { source, axis_hint } => {
                        let location = DatasetLocation::new(path)?;
                        out.push(
                            ShapeDtypeDescriptor::new(
                                location,
                                source.shape().to_vec(),
                                source.data_type(),
                            )?
                            .with_axis_hint(*axis_hint),
                        );
                    }
                    SourceNode::Ragged { values, index } => {
                        let location = DatasetLocation::new(path)?;
                        let index_location = location.index_location();
                        out.push(ShapeDtypeDescriptor::new(
                            location,
                            values.shape().to_vec(),
                            values.data_type(),
                        )?);
                        out.push(ShapeDtypeDescriptor::new(
                            index_location,
                            index.shape().to_vec(),
                            index.data_type(),
                        )?);
                    }
                    SourceNode::ExternalReference(_) | SourceNode::Attribute(_) => {}
                }
            }
            Ok(())
        }
        let mut out = Vec::new();
        walk(&self.root, "", &mut out)?;
        Ok(out)
    }

    /// Return the non-data leaves (external references and attributes), in
    /// discovery order.
    #[must_use]
    pub fn non_data_leaves(&self) -> Vec<(DatasetLocation, NonDataLeaf<'_>)> {
        fn walk<'a>(
            children: &'a [(String, SourceNode)],
            prefix: &str,
            out: &mut Vec<(DatasetLocation, NonDataLeaf<'a>)>,
        ) {
            for (name, node) in children {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };
                match node {
                    SourceNode::Group(next) => walk(next, &path, out),
                    SourceNode::ExternalReference(target) => {
                        let location =
                            DatasetLocation::new(path).expect("built from valid segments");
                        out.push((location, NonDataLeaf::ExternalReference(target)));
                    }
                    SourceNode::Attribute(value) => {
                        let location =
                            DatasetLocation::new(path).expect("built from valid segments");
                        out.push((location, NonDataLeaf::Attribute(value)));
                    }
                    SourceNode::Dataset { .. } | SourceNode::Ragged { .. } => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.root, "", &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    fn u8_source(shape: Vec<u64>) -> InMemorySource {
        let count = shape.iter().product::<u64>() as usize;
        InMemorySource::from_elements::<u8>(shape, vec![0; count]).unwrap()
    }

    fn index_source(len: u64) -> InMemorySource {
        InMemorySource::from_elements::<u64>(vec![len], (0..len).collect()).unwrap()
    }

    #[test]
    fn graph_discovery_order() {
        let mut graph = SourceGraph::new();
        graph
            .add_dataset("acquisition/series/data", u8_source(vec![4, 2]), AxisHint::ChannelStream)
            .unwrap();
        graph
            .add_ragged("tables/units/times", u8_source(vec![10]), index_source(3))
            .unwrap();
        graph
            .add_external_reference("acquisition/video", "/data/video.avi")
            .unwrap();
        graph
            .add_attribute("acquisition/series/rate", serde_json::json!(30000.0))
            .unwrap();

        let descriptors = graph.descriptors().unwrap();
        let locations: Vec<&str> = descriptors
            .iter()
            .map(|descriptor| descriptor.location().as_str())
            .collect();
        assert_eq!(
            locations,
            vec![
                "acquisition/series/data",
                "tables/units/times",
                "tables/units/times_index",
            ]
        );
        assert_eq!(descriptors[0].axis_hint(), AxisHint::ChannelStream);
        assert_eq!(descriptors[2].data_type(), DataType::UInt64);

        let non_data = graph.non_data_leaves();
        assert_eq!(non_data.len(), 2);
        assert_eq!(non_data[0].0.as_str(), "acquisition/video");
    }

    #[test]
    fn graph_resolves_ragged_index() {
        let mut graph = SourceGraph::new();
        graph
            .add_ragged("t/c", u8_source(vec![10]), index_source(3))
            .unwrap();
        let values_location = DatasetLocation::new("t/c").unwrap();
        let index_location = values_location.index_location();
        assert!(graph.has_dataset(&values_location));
        assert!(graph.has_dataset(&index_location));
        assert_eq!(
            graph.source_mut(&values_location).unwrap().shape(),
            &[10]
        );
        assert_eq!(graph.source_mut(&index_location).unwrap().shape(), &[3]);
        assert!(
            graph
                .source_mut(&DatasetLocation::new("t/missing").unwrap())
                .is_none()
        );
    }

    #[test]
    fn graph_rejects_collisions() {
        let mut graph = SourceGraph::new();
        graph.add_dataset("a/b", u8_source(vec![2]), AxisHint::Generic).unwrap();
        assert!(matches!(
            graph.add_dataset("a/b", u8_source(vec![2]), AxisHint::Generic),
            Err(GraphError::DuplicateNode(_))
        ));
        assert!(matches!(
            graph.add_dataset("a/b/c", u8_source(vec![2]), AxisHint::Generic),
            Err(GraphError::NotAGroup(_))
        ));
    }

    #[test]
    fn graph_rejects_bad_ragged_index() {
        let mut graph = SourceGraph::new();
        assert!(matches!(
            graph.add_ragged("t/c", u8_source(vec![10]), u8_source(vec![3])),
            Err(GraphError::InvalidRaggedIndex { .. })
        ));
    }
}
