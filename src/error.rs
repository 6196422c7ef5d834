use std::collections::TryReserveError;
use thiserror::Error;

/// Error type for [`AssocTable`](crate::AssocTable) operations.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum TableError {
    /// A required input was malformed, e.g., a zero capacity.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Memory for the bucket array, a chain, or a key copy could not be allocated.
    ///
    /// The table is left untouched; the caller may retry or give up.
    #[error("memory allocation failed")]
    MemoryError,

    /// The key has no live entry in the table.
    #[error("key not found")]
    KeyNotFound,
}

impl From<TryReserveError> for TableError {
    #[inline]
    fn from(_: TryReserveError) -> Self {
        TableError::MemoryError
    }
}

/// Result type alias for [`AssocTable`](crate::AssocTable) operations.
pub type Result<T> = std::result::Result<T, TableError>;
