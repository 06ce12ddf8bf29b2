use crate::dataset::DataType;

/// A fixed-width Rust element type with a [`DataType`] tag.
///
/// Implemented for the numeric types the data model supports; used to build
/// typed in-memory sources without unsafe byte juggling.
pub trait Element: bytemuck::Pod {
    /// The data type tag of the element type.
    const DATA_TYPE: DataType;
}

macro_rules! impl_element {
    ($rust_type:ty, $data_type:expr) => {
        impl Element for $rust_type {
            const DATA_TYPE: DataType = $data_type;
        }
    };
}

impl_element!(i8, DataType::Int8);
impl_element!(i16, DataType::Int16);
impl_element!(i32, DataType::Int32);
impl_element!(i64, DataType::Int64);
impl_element!(u8, DataType::UInt8);
impl_element!(u16, DataType::UInt16);
impl_element!(u32, DataType::UInt32);
impl_element!(u64, DataType::UInt64);
impl_element!(f32, DataType::Float32);
impl_element!(f64, DataType::Float64);
