//! A storage wrapper that defers every response by a fixed duration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Storage, StorageResult};

/// Delegates to an inner [`Storage`] but holds back every response for a
/// fixed duration.
///
/// Useful for exercising latency-sensitive callers against the in-memory
/// backend, which otherwise responds instantly. The operation itself is
/// applied immediately; only the response is deferred.
pub struct DelayedStorage {
    inner: Arc<dyn Storage>,
    delay: Duration,
}

impl DelayedStorage {
    /// Wraps an existing storage with the given response delay.
    pub fn new(inner: Arc<dyn Storage>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl Storage for DelayedStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Bytes>> {
        let result = self.inner.get(key).await;
        tokio::time::sleep(self.delay).await;
        result
    }

    async fn put(&self, key: Bytes, value: Bytes) -> StorageResult<()> {
        let result = self.inner.put(key, value).await;
        tokio::time::sleep(self.delay).await;
        result
    }

    async fn remove(&self, key: Bytes) -> StorageResult<()> {
        let result = self.inner.remove(key).await;
        tokio::time::sleep(self.delay).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::storage::in_memory::InMemoryStorage;

    #[tokio::test]
    async fn should_delay_every_response() {
        // given
        let inner = Arc::new(InMemoryStorage::new());
        let storage = DelayedStorage::new(inner, Duration::from_millis(20));

        // when
        let started = Instant::now();
        storage
            .put(Bytes::from("key"), Bytes::from("value"))
            .await
            .unwrap();
        let result = storage.get(Bytes::from("key")).await.unwrap();

        // then
        assert_eq!(result, Some(Bytes::from("value")));
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn should_apply_operation_before_the_delay_elapses() {
        // given
        let inner = Arc::new(InMemoryStorage::new());
        let storage = DelayedStorage::new(inner.clone(), Duration::from_millis(20));

        // when
        storage
            .put(Bytes::from("key"), Bytes::from("value"))
            .await
            .unwrap();

        // then - the write is visible through the undelayed inner handle
        let result = inner.get(Bytes::from("key")).await.unwrap();
        assert_eq!(result, Some(Bytes::from("value")));
    }
}
