pub mod column;
pub mod datatypes;
pub mod kernels;
pub mod schema;

pub use column::Column;
pub use datatypes::{DataType, Field};
pub use schema::{Schema, SchemaRef};
