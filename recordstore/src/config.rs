//! Configuration options for opening a record store.

use std::time::Duration;

/// Configuration for opening a [`RecordStore`](crate::RecordStore).
///
/// One store instance manages one collection; the collection name doubles as
/// the storage key of the persisted key index.
#[derive(Debug, Clone)]
pub struct Config {
    /// Collection name. Record keys are derived as `"<name>:<id>"`.
    pub name: String,

    /// Field names eligible for attribute-based lookup via
    /// [`fetch`](crate::RecordStore::fetch).
    pub indexed_fields: Vec<String>,

    /// Optional artificial delay applied to every storage response, for
    /// exercising latency-sensitive callers.
    pub delay: Option<Duration>,
}

impl Config {
    /// Creates a configuration for the given collection name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexed_fields: Vec::new(),
            delay: None,
        }
    }

    /// Declares the fields eligible for attribute-based lookup.
    pub fn with_indexed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexed_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Applies an artificial delay to every storage response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}
