mod error;

pub use error::{SkiffError, SkiffResult};
