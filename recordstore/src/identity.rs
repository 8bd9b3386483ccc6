//! Identity generation for new records.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::RecordId;

/// Produces identities for records that arrive without one.
///
/// A generator is injected per store instance, so two stores never share
/// counter state unless the caller explicitly shares a generator.
#[async_trait]
pub trait IdGenerator: Send + Sync {
    /// Returns the next identity.
    async fn next_id(&self) -> Result<RecordId>;
}

/// Default generator: monotonically increasing integers starting at 1.
///
/// The counter is owned by the generator instance. State is not persisted;
/// a caller that needs identities to survive restarts supplies its own
/// generator.
pub struct SequentialIdGenerator {
    next: Mutex<u64>,
}

impl SequentialIdGenerator {
    /// Creates a generator whose first identity is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a generator whose first identity is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Mutex::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdGenerator for SequentialIdGenerator {
    async fn next_id(&self) -> Result<RecordId> {
        let mut next = self.next.lock().await;
        let id = *next;
        *next += 1;
        Ok(RecordId::Int(id))
    }
}
