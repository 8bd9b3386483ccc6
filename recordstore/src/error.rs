//! Error types for record store operations.

use common::StorageError;

/// Error type for record store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A record was absent where one was required: a direct read or destroy
    /// missed, an attribute fetch matched no rows, or an increment target
    /// did not exist.
    NotFound {
        /// Collection the record belongs to.
        collection: String,
        /// Identity of the record, or `"(new)"` when it was never assigned.
        id: String,
        /// The operation that missed ("read", "destroy", "increment").
        op: &'static str,
    },

    /// An attribute-based fetch was attempted with no indexed attribute set.
    InvalidQuery(String),

    /// Errors from the underlying storage backend, passed through unchanged.
    Storage(StorageError),

    /// Serialization or deserialization errors at the storage boundary.
    Codec(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound { collection, id, op } => {
                write!(f, "{} ({}) not found ({})", collection, id, op)
            }
            Error::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
            Error::Storage(err) => write!(f, "{}", err),
            Error::Codec(msg) => write!(f, "Codec error: {}", msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

/// Result type alias for record store operations.
pub type Result<T> = std::result::Result<T, Error>;
