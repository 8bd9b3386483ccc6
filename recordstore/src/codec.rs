//! Stored value representation, JSON codec, and update merge rules.

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// What lives under a record key, tagged by shape.
///
/// Update semantics differ per shape: field maps merge field-wise, sequences
/// append-and-deduplicate, anything else is replaced wholesale. Dispatching
/// on the variant keeps those rules in one place instead of spreading runtime
/// type checks through the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// An unordered field map.
    Map(Map<String, Value>),
    /// A sequence of values.
    List(Vec<Value>),
    /// A single scalar (string, number, boolean, or null).
    Scalar(Value),
}

impl StoredValue {
    /// Tags a JSON value by its shape.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => StoredValue::Map(map),
            Value::Array(items) => StoredValue::List(items),
            other => StoredValue::Scalar(other),
        }
    }

    /// Returns the untagged JSON value.
    pub fn into_value(self) -> Value {
        match self {
            StoredValue::Map(map) => Value::Object(map),
            StoredValue::List(items) => Value::Array(items),
            StoredValue::Scalar(value) => value,
        }
    }

    /// Decodes a stored value from its JSON text form.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| Error::Codec(e.to_string()))?;
        Ok(Self::from_value(value))
    }

    /// Encodes the value to JSON text for storage.
    pub fn encode(&self) -> Result<Bytes> {
        let value = match self {
            StoredValue::Map(map) => serde_json::to_vec(map),
            StoredValue::List(items) => serde_json::to_vec(items),
            StoredValue::Scalar(value) => serde_json::to_vec(value),
        };
        value
            .map(Bytes::from)
            .map_err(|e| Error::Codec(e.to_string()))
    }

    /// Merges an incoming value into this stored value.
    ///
    /// - Map + map: deep field merge, incoming wins on conflict.
    /// - List: incoming is appended (a list flattens one level), then the
    ///   sequence is deduplicated keeping first occurrences.
    /// - Anything else: incoming fully replaces the stored value.
    pub fn merge(self, incoming: Value) -> StoredValue {
        match (self, incoming) {
            (StoredValue::Map(mut current), Value::Object(incoming)) => {
                deep_merge(&mut current, incoming);
                StoredValue::Map(current)
            }
            (StoredValue::List(mut current), incoming) => {
                match incoming {
                    Value::Array(items) => current.extend(items),
                    other => current.push(other),
                }
                StoredValue::List(dedup(current))
            }
            (_, incoming) => StoredValue::from_value(incoming),
        }
    }
}

/// Merges `incoming` into `current` field by field; nested maps merge
/// recursively, everything else is overwritten by the incoming value.
fn deep_merge(current: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (field, incoming_value) in incoming {
        if let Value::Object(nested) = incoming_value {
            if let Some(Value::Object(existing)) = current.get_mut(&field) {
                deep_merge(existing, nested);
            } else {
                current.insert(field, Value::Object(nested));
            }
        } else {
            current.insert(field, incoming_value);
        }
    }
}

/// Removes duplicate values, keeping the first occurrence of each.
fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
