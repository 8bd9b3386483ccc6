//! Failure injection for storage, gated behind the `test-utils` feature.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Storage, StorageError, StorageResult};

/// Injected failure that fires either once or on every call.
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(StorageError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(StorageError),
}

type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is atomically swapped to `None` so the
/// error fires exactly once. For [`Failure::Persistent`], the slot is left
/// unchanged.
fn check_failure(slot: &FailSlot) -> StorageResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            // Swap to None; if another task raced us, one of them gets the
            // error and the others pass through, which is fine for tests.
            let prev = slot.swap(Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

/// A storage wrapper that delegates to an inner [`Storage`] but can inject
/// failures into `get`, `put`, and `remove` on demand.
///
/// Each failure slot is controlled by a lock-free [`ArcSwap`](arc_swap::ArcSwap).
/// Failures can be *persistent* (returned on every call until cleared) or
/// *once* (returned on the next call, then automatically cleared).
///
/// # Example
///
/// ```ignore
/// let inner = Arc::new(InMemoryStorage::new());
/// let storage = FailingStorage::wrap(inner);
/// storage.fail_put(StorageError::Storage("disk full".into()));
/// // every put call now returns Err(...)
///
/// storage.fail_get_once(StorageError::Storage("io error".into()));
/// // only the next get call returns Err(...), then auto-clears
/// ```
pub struct FailingStorage {
    inner: Arc<dyn Storage>,
    fail_get: FailSlot,
    fail_put: FailSlot,
    fail_remove: FailSlot,
}

impl FailingStorage {
    /// Wraps an existing storage, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_get: arc_swap::ArcSwap::from_pointee(None),
            fail_put: arc_swap::ArcSwap::from_pointee(None),
            fail_remove: arc_swap::ArcSwap::from_pointee(None),
        })
    }

    /// Makes `get` return the given error on every subsequent call.
    pub fn fail_get(&self, err: StorageError) {
        self.fail_get.store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `get` return the given error on the next call only.
    pub fn fail_get_once(&self, err: StorageError) {
        self.fail_get.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `put` return the given error on every subsequent call.
    pub fn fail_put(&self, err: StorageError) {
        self.fail_put.store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `put` return the given error on the next call only.
    pub fn fail_put_once(&self, err: StorageError) {
        self.fail_put.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `remove` return the given error on every subsequent call.
    pub fn fail_remove(&self, err: StorageError) {
        self.fail_remove
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `remove` return the given error on the next call only.
    pub fn fail_remove_once(&self, err: StorageError) {
        self.fail_remove.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Clears all pending failure injections.
    pub fn clear(&self) {
        self.fail_get.store(Arc::new(None));
        self.fail_put.store(Arc::new(None));
        self.fail_remove.store(Arc::new(None));
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Bytes>> {
        check_failure(&self.fail_get)?;
        self.inner.get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes) -> StorageResult<()> {
        check_failure(&self.fail_put)?;
        self.inner.put(key, value).await
    }

    async fn remove(&self, key: Bytes) -> StorageResult<()> {
        check_failure(&self.fail_remove)?;
        self.inner.remove(key).await
    }
}
