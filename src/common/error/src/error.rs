use thiserror::Error;

pub type SkiffResult<T> = std::result::Result<T, SkiffError>;

#[derive(Debug, Error)]
pub enum SkiffError {
    #[error("{0:?}")]
    ArrowError(#[from] arrow2::error::Error),
    #[error("{0}")]
    ComputeError(String),
    #[error("{0}")]
    SchemaMismatch(String),
    #[error("{0}")]
    TypeError(String),
    #[error("{0}")]
    ValueError(String),
    #[error("{0}")]
    InternalError(String),
}
