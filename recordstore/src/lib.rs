//! RecordStore - a local record layer over a key-value backend.
//!
//! RecordStore gives an object-model caller create, read, update, delete and
//! query operations over records kept in a flat key-value store. Multi-record
//! queries are emulated in memory: a per-collection key index enumerates the
//! live records, every record is loaded, and filtering, sorting and
//! pagination run over the loaded set.
//!
//! # Architecture
//!
//! One [`RecordStore`] manages one collection. Records serialize to JSON text
//! under `"<collection>:<id>"`; the ordered list of live keys persists under
//! the bare collection name. The storage backend is anything implementing
//! `common::Storage` (`get`/`put`/`remove` over opaque bytes).
//!
//! # Key Concepts
//!
//! - **[`RecordStore`]**: the per-collection entry point for all operations.
//! - **[`Record`]**: a field map with one distinguished identity field;
//!   identities are assigned on create by an injected [`IdGenerator`].
//! - **[`KeyIndex`]**: the ordered live-key list that stands in for a real
//!   database index.
//! - **[`Query`]** / **[`Filter`]**: in-memory filtering, sorting and
//!   offset/limit/cursor pagination.
//! - **[`StoredValue`]**: the shape-tagged stored form; update merges
//!   dispatch on it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use common::InMemoryStorage;
//! use recordstore::{Config, Filter, Query, Record, RecordStore};
//!
//! let storage = Arc::new(InMemoryStorage::new());
//! let store = RecordStore::open(storage, Config::new("users")).await?;
//!
//! // Create a record; the store assigns id 1.
//! let mut user = Record::new();
//! user.set("name", "alice");
//! user.set("age", 30);
//! store.create(&mut user).await?;
//!
//! // Query the collection.
//! let adults = store
//!     .find_all(&Query::new().with_filter(Filter::new().gte("age", 18)).sort_by("name"))
//!     .await?;
//!
//! // Remove the record again.
//! store.destroy(&user).await?;
//! ```

mod codec;
mod config;
mod error;
mod identity;
mod index;
mod model;
mod query;
mod store;

pub use codec::StoredValue;
pub use config::Config;
pub use error::{Error, Result};
pub use identity::{IdGenerator, SequentialIdGenerator};
pub use index::KeyIndex;
pub use model::{Record, RecordId};
pub use query::{Condition, Filter, Operand, Operator, Query};
pub use store::{Increment, RecordStore};
