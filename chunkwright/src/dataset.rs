//! The dataset data model: element types, locations, and shape/dtype
//! descriptors.

mod data_type;
mod descriptor;
mod location;

pub use data_type::{DataType, UnknownDataTypeError};
pub use descriptor::{AxisHint, DescriptorError, ShapeDtypeDescriptor};
pub use location::{DatasetLocation, DatasetLocationError};
