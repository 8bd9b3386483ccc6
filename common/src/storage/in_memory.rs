use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Storage, StorageError, StorageResult};

/// In-memory implementation of the [`Storage`] trait using a BTreeMap.
///
/// This implementation stores all data in memory and is useful for testing
/// or scenarios where durability is not required.
pub struct InMemoryStorage {
    data: RwLock<BTreeMap<Bytes, Bytes>>,
}

impl InMemoryStorage {
    /// Creates a new InMemoryStorage instance with an empty store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    /// Retrieves a single value by key from the in-memory store.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Bytes>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&key).cloned())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn put(&self, key: Bytes, value: Bytes) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(key, value);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn remove(&self, key: Bytes) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        data.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_return_none_when_key_not_found() {
        // given
        let storage = InMemoryStorage::new();

        // when
        let result = storage.get(Bytes::from("missing_key")).await;

        // then
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_store_and_retrieve_value() {
        // given
        let storage = InMemoryStorage::new();
        let key = Bytes::from("test_key");
        let value = Bytes::from("test_value");

        // when
        storage.put(key.clone(), value.clone()).await.unwrap();
        let result = storage.get(key).await.unwrap();

        // then
        assert_eq!(result, Some(value));
    }

    #[tokio::test]
    async fn should_overwrite_existing_key() {
        // given
        let storage = InMemoryStorage::new();
        let key = Bytes::from("test_key");

        // when
        storage
            .put(key.clone(), Bytes::from("initial_value"))
            .await
            .unwrap();
        storage
            .put(key.clone(), Bytes::from("updated_value"))
            .await
            .unwrap();
        let result = storage.get(key).await.unwrap();

        // then
        assert_eq!(result, Some(Bytes::from("updated_value")));
    }

    #[tokio::test]
    async fn should_remove_existing_key() {
        // given
        let storage = InMemoryStorage::new();
        let key = Bytes::from("to_remove");
        storage.put(key.clone(), Bytes::from("value")).await.unwrap();

        // when
        storage.remove(key.clone()).await.unwrap();
        let result = storage.get(key).await.unwrap();

        // then
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_remove_nonexistent_key_without_error() {
        // given
        let storage = InMemoryStorage::new();

        // when
        let result = storage.remove(Bytes::from("nonexistent")).await;

        // then
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_track_stored_key_count() {
        // given
        let storage = InMemoryStorage::new();
        assert!(storage.is_empty());

        // when
        storage
            .put(Bytes::from("key1"), Bytes::from("value1"))
            .await
            .unwrap();
        storage
            .put(Bytes::from("key2"), Bytes::from("value2"))
            .await
            .unwrap();

        // then
        assert_eq!(storage.len(), 2);
    }
}
