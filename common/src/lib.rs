pub mod storage;

#[cfg(feature = "test-utils")]
pub use storage::failing::FailingStorage;
pub use storage::delayed::DelayedStorage;
pub use storage::in_memory::InMemoryStorage;
pub use storage::{Storage, StorageError, StorageResult};
