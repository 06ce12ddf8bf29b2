use std::fmt::Display;

use thiserror::Error;

/// The logical location of a dataset within a container tree.
///
/// Locations are slash-delimited paths such as
/// `acquisition/ElectricalSeries/data`, unique within one container. A valid
/// location has no leading or trailing slash and no empty, `.`, or `..`
/// segments.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DatasetLocation(String);

/// An invalid dataset location error.
#[derive(Clone, Debug, Error)]
#[error("invalid dataset location {_0}")]
pub struct DatasetLocationError(String);

impl DatasetLocation {
    /// Create a new dataset location from `location`.
    ///
    /// # Errors
    /// Returns [`DatasetLocationError`] if `location` is not valid.
    pub fn new(location: impl Into<String>) -> Result<Self, DatasetLocationError> {
        let location = location.into();
        if Self::validate(&location) {
            Ok(Self(location))
        } else {
            Err(DatasetLocationError(location))
        }
    }

    /// Validate a dataset location string.
    #[must_use]
    pub fn validate(location: &str) -> bool {
        !location.is_empty()
            && location
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
    }

    /// Extract a string slice of the underlying location.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the location of the index dataset paired with a ragged values
    /// dataset at this location.
    #[must_use]
    pub fn index_location(&self) -> Self {
        Self(format!("{}_index", self.0))
    }
}

impl AsRef<str> for DatasetLocation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for DatasetLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for DatasetLocation {
    type Error = DatasetLocationError;

    fn try_from(location: &str) -> Result<Self, Self::Error> {
        Self::new(location)
    }
}

impl serde::Serialize for DatasetLocation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DatasetLocation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let location = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::new(location).map_err(serde::de::Error::custom)
    }
}
