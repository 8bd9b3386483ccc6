//! Record and identity types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity assigned to a record.
///
/// The default generator produces integer identities; custom generators may
/// produce strings (e.g. externally minted opaque ids). Either form displays
/// as its raw text when deriving storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Auto-incrementing integer identity.
    Int(u64),
    /// Caller-supplied string identity.
    Text(String),
}

impl RecordId {
    /// Returns the identity as a JSON value, as it appears inside a stored
    /// record's identity field.
    pub fn as_value(&self) -> Value {
        match self {
            RecordId::Int(n) => Value::from(*n),
            RecordId::Text(s) => Value::from(s.clone()),
        }
    }

    /// Reads an identity out of a JSON value, if the value has an identity
    /// shape (unsigned integer or string).
    pub fn from_value(value: &Value) -> Option<RecordId> {
        match value {
            Value::Number(n) => n.as_u64().map(RecordId::Int),
            Value::String(s) => Some(RecordId::Text(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Text(s)
    }
}

/// A record being persisted: a field map with one distinguished identity
/// field.
///
/// A record is *new* until its identity field is set; the store assigns an
/// identity on create. The identity field name defaults to `"id"` and can be
/// overridden per record for models that name their identity differently.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id_field: String,
    fields: Map<String, Value>,
}

impl Record {
    /// Creates an empty record with the default `"id"` identity field.
    pub fn new() -> Self {
        Self::with_id_field("id")
    }

    /// Creates an empty record with a custom identity field name.
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            fields: Map::new(),
        }
    }

    /// Creates a record from an existing field map, keeping the default
    /// `"id"` identity field.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            id_field: "id".to_string(),
            fields,
        }
    }

    /// Returns the name of the identity field.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Returns true while no identity has been assigned.
    pub fn is_new(&self) -> bool {
        !self.fields.contains_key(&self.id_field)
    }

    /// Returns the record's identity, if assigned.
    pub fn id(&self) -> Option<RecordId> {
        self.fields.get(&self.id_field).and_then(RecordId::from_value)
    }

    /// Assigns the record's identity.
    pub fn set_id(&mut self, id: RecordId) {
        self.fields.insert(self.id_field.clone(), id.as_value());
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Returns the serialized form of the record: its full field map,
    /// identity included once assigned.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Derives the record's storage key within a collection: the bare
    /// collection name while the record is new, `"<collection>:<id>"` once
    /// identified.
    pub fn key(&self, collection: &str) -> String {
        match self.id() {
            Some(id) => format!("{}:{}", collection, id),
            None => collection.to_string(),
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}
