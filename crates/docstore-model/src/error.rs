use thiserror::Error;

/// Errors raised by container mutators.
///
/// Every error is returned before any listener runs or any data changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A value or an `assign` source has a type the container cannot hold.
    #[error("type error: {0}")]
    Type(String),
    /// A list key that does not parse as an integer.
    #[error("type error: list index must be an integer, got {0:?}")]
    InvalidIndex(String),
    /// The assignment would make a container its own (transitive) child.
    #[error("cyclic reference: a container cannot contain itself")]
    CyclicReference,
    /// A list index outside the valid range after negative-index resolution.
    #[error("range error: index {index} out of range for list of size {size}")]
    Range { index: isize, size: usize },
    /// A replayed change does not match the live tree.
    #[error("value error: {0}")]
    Value(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TypeError,
    CyclicReferenceError,
    RangeError,
    ValueError,
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Type(_) | ModelError::InvalidIndex(_) => ErrorKind::TypeError,
            ModelError::CyclicReference => ErrorKind::CyclicReferenceError,
            ModelError::Range { .. } => ErrorKind::RangeError,
            ModelError::Value(_) => ErrorKind::ValueError,
        }
    }
}
