use std::fmt::Display;
use std::num::NonZeroU32;

use thiserror::Error;

/// The element type of a dataset.
///
/// Fixed-width numerics plus fixed-width ASCII strings. Variable-length
/// (ragged) data is not an element type: it is stored as a flat values
/// dataset plus a 1-D [`DataType::UInt64`] index dataset.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DataType {
    /// `i8`
    Int8,
    /// `i16`
    Int16,
    /// `i32`
    Int32,
    /// `i64`
    Int64,
    /// `u8`
    UInt8,
    /// `u16`
    UInt16,
    /// `u32`
    UInt32,
    /// `u64`
    UInt64,
    /// `f32`
    Float32,
    /// `f64`
    Float64,
    /// An ASCII string of a fixed byte length.
    FixedAscii(NonZeroU32),
}

/// An unknown data type name error.
#[derive(Clone, Debug, Error)]
#[error("unknown data type name {_0}")]
pub struct UnknownDataTypeError(String);

impl DataType {
    /// The size in bytes of one element.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
            Self::FixedAscii(len) => len.get() as usize,
        }
    }

    /// The stable name of the data type, as stored in container metadata.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Int8 => "int8".to_string(),
            Self::Int16 => "int16".to_string(),
            Self::Int32 => "int32".to_string(),
            Self::Int64 => "int64".to_string(),
            Self::UInt8 => "uint8".to_string(),
            Self::UInt16 => "uint16".to_string(),
            Self::UInt32 => "uint32".to_string(),
            Self::UInt64 => "uint64".to_string(),
            Self::Float32 => "float32".to_string(),
            Self::Float64 => "float64".to_string(),
            Self::FixedAscii(len) => format!("ascii{len}"),
        }
    }

    /// Create a data type from its stable name.
    ///
    /// # Errors
    /// Returns [`UnknownDataTypeError`] if `name` is not a recognised data type name.
    pub fn from_name(name: &str) -> Result<Self, UnknownDataTypeError> {
        match name {
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => name
                .strip_prefix("ascii")
                .and_then(|len| len.parse::<NonZeroU32>().ok())
                .map(Self::FixedAscii)
                .ok_or_else(|| UnknownDataTypeError(name.to_string())),
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl serde::Serialize for DataType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> serde::Deserialize<'de> for DataType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_name(&name).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_names() {
        for data_type in [
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::UInt8,
            DataType::UInt16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Float32,
            DataType::Float64,
            DataType::FixedAscii(NonZeroU32::new(16).unwrap()),
        ] {
            assert_eq!(DataType::from_name(&data_type.name()).unwrap(), data_type);
        }
        assert!(DataType::from_name("complex64").is_err());
        assert!(DataType::from_name("ascii0").is_err());
        assert!(DataType::from_name("ascii").is_err());
    }

    #[test]
    fn data_type_sizes() {
        assert_eq!(DataType::Int8.size_bytes(), 1);
        assert_eq!(DataType::Float64.size_bytes(), 8);
        assert_eq!(
            DataType::FixedAscii(NonZeroU32::new(12).unwrap()).size_bytes(),
            12
        );
    }

    #[test]
    fn data_type_serde() {
        let json = serde_json::to_string(&DataType::Float32).unwrap();
        assert_eq!(json, "\"float32\"");
        let data_type: DataType = serde_json::from_str("\"ascii8\"").unwrap();
        assert_eq!(
            data_type,
            DataType::FixedAscii(NonZeroU32::new(8).unwrap())
        );
        assert!(serde_json::from_str::<DataType>("\"float128\"").is_err());
    }
}
