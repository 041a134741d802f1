mod dtype;
mod field;

pub use dtype::DataType;
pub use field::{Field, FieldRef};
