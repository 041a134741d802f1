use arrow2::datatypes::DataType as ArrowType;
use common_error::{SkiffError, SkiffResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
    Binary,
}

impl DataType {
    pub fn to_arrow(&self) -> ArrowType {
        match self {
            Self::Null => ArrowType::Null,
            Self::Boolean => ArrowType::Boolean,
            Self::Int8 => ArrowType::Int8,
            Self::Int16 => ArrowType::Int16,
            Self::Int32 => ArrowType::Int32,
            Self::Int64 => ArrowType::Int64,
            Self::UInt8 => ArrowType::UInt8,
            Self::UInt16 => ArrowType::UInt16,
            Self::UInt32 => ArrowType::UInt32,
            Self::UInt64 => ArrowType::UInt64,
            Self::Float32 => ArrowType::Float32,
            Self::Float64 => ArrowType::Float64,
            Self::Utf8 => ArrowType::LargeUtf8,
            Self::Binary => ArrowType::LargeBinary,
        }
    }

    pub fn from_arrow(dtype: &ArrowType) -> SkiffResult<Self> {
        match dtype {
            ArrowType::Null => Ok(Self::Null),
            ArrowType::Boolean => Ok(Self::Boolean),
            ArrowType::Int8 => Ok(Self::Int8),
            ArrowType::Int16 => Ok(Self::Int16),
            ArrowType::Int32 => Ok(Self::Int32),
            ArrowType::Int64 => Ok(Self::Int64),
            ArrowType::UInt8 => Ok(Self::UInt8),
            ArrowType::UInt16 => Ok(Self::UInt16),
            ArrowType::UInt32 => Ok(Self::UInt32),
            ArrowType::UInt64 => Ok(Self::UInt64),
            ArrowType::Float32 => Ok(Self::Float32),
            ArrowType::Float64 => Ok(Self::Float64),
            ArrowType::LargeUtf8 => Ok(Self::Utf8),
            ArrowType::LargeBinary => Ok(Self::Binary),
            _ => Err(SkiffError::TypeError(format!(
                "Unsupported arrow type: {dtype:?}"
            ))),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
