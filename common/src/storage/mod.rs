pub mod delayed;
#[cfg(feature = "test-utils")]
pub mod failing;
pub mod in_memory;

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage-related errors
    Storage(String),
    /// Internal errors
    Internal(String),
}

impl std::error::Error for StorageError {}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StorageError::Storage(msg) => write!(f, "Storage error: {}", msg),
            StorageError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StorageError {
    /// Converts a backend error to StorageError::Storage.
    pub fn from_storage(e: impl std::fmt::Display) -> Self {
        StorageError::Storage(e.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// The storage type encapsulates access to the underlying key-value backend.
///
/// Values are opaque byte strings; callers serialize and deserialize at their
/// own boundary. Implementations are shared behind `Arc<dyn Storage>` and must
/// be safe to call from multiple tasks.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Gets the value for a key, or `None` if the key does not exist.
    async fn get(&self, key: Bytes) -> StorageResult<Option<Bytes>>;

    /// Puts a key-value pair, overwriting any existing value.
    async fn put(&self, key: Bytes, value: Bytes) -> StorageResult<()>;

    /// Removes a key. No-op if the key does not exist.
    async fn remove(&self, key: Bytes) -> StorageResult<()>;
}
