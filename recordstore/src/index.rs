//! The per-collection key index.

use bytes::Bytes;

use crate::error::{Error, Result};

/// Ordered list of the live record keys of one collection.
///
/// The index is the store's only way to enumerate a collection: multi-record
/// reads load exactly the keys listed here. It persists under the bare
/// collection name as a single comma-joined string. After any successful
/// create or destroy it holds exactly the live keys, each once, in insertion
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    keys: Vec<String>,
}

impl KeyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Decodes an index from its persisted comma-joined form.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Codec(format!("key index is not valid UTF-8: {}", e)))?;
        if text.is_empty() {
            return Ok(Self::new());
        }
        Ok(Self {
            keys: text.split(',').map(str::to_string).collect(),
        })
    }

    /// Encodes the index to its persisted comma-joined form.
    pub fn encode(&self) -> Bytes {
        Bytes::from(self.keys.join(","))
    }

    /// Appends a key unless it is already present.
    ///
    /// Returns true if the key was appended.
    pub fn push_unique(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.keys.iter().any(|k| k == &key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Removes the first occurrence of a key.
    ///
    /// Returns true if the key was present.
    pub fn remove_first(&mut self, key: &str) -> bool {
        match self.keys.iter().position(|k| k == key) {
            Some(position) => {
                self.keys.remove(position);
                true
            }
            None => false,
        }
    }

    /// Returns the keys in insertion order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when no keys are indexed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
