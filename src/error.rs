use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index out of bounds: {index} >= {capacity}")]
    IndexOutOfBounds { index: usize, capacity: usize },

    #[error("Number of registers must be a power of two, got {0}")]
    InvalidRegisterCount(usize),

    #[error("Cannot merge: {what} mismatch ({expected} != {actual})")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Filter is full: no free slot after {kicks} relocations")]
    FilterFull { kicks: usize },

    #[error("Unknown hash algorithm: {0}")]
    UnknownHashAlgorithm(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl From<EncodeError> for FilterError {
    fn from(err: EncodeError) -> Self {
        FilterError::SerializationError(err.to_string())
    }
}

impl From<DecodeError> for FilterError {
    fn from(err: DecodeError) -> Self {
        FilterError::SerializationError(err.to_string())
    }
}
