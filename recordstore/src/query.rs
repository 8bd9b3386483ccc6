//! In-memory query evaluation: filter, sort, cursor, pagination.
//!
//! The engine emulates what a real database would do natively, with a linear
//! scan over records already loaded from storage. Evaluation order is fixed:
//! filter, then sort, then cursor/offset, then limit. Reordering changes
//! results.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::RecordId;

/// A filter operand, normalized at construction.
///
/// Values that have no native JSON representation enter as their canonical
/// string form: date-times as RFC 3339, opaque ids as plain strings.
/// Normalization happens here, at construction; comparison never inspects
/// runtime types.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand(Value);

impl Operand {
    /// Returns the normalized JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Builds a sub-document operand for equality against nested maps.
    ///
    /// Entries go through the same normalization as top-level operands, so
    /// nested date-times compare by their string form too.
    pub fn map<I, S>(entries: I) -> Operand
    where
        I: IntoIterator<Item = (S, Operand)>,
        S: Into<String>,
    {
        Operand(Value::Object(
            entries
                .into_iter()
                .map(|(field, operand)| (field.into(), operand.0))
                .collect(),
        ))
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand(Value::from(value))
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand(Value::from(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand(Value::from(value))
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand(Value::from(value))
    }
}

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Operand(Value::from(value))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand(Value::from(value))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand(Value::from(value))
    }
}

impl From<DateTime<Utc>> for Operand {
    fn from(value: DateTime<Utc>) -> Self {
        Operand(Value::from(value.to_rfc3339()))
    }
}

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Exact match (the default).
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Value is one of the operand list.
    In,
    /// Value is none of the operand list.
    NotIn,
}

/// A single filter condition: field, operator, operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    op: Operator,
    operand: Value,
}

impl Condition {
    /// Builds a condition from its parts.
    pub fn new(field: impl Into<String>, op: Operator, operand: impl Into<Operand>) -> Self {
        Self {
            field: field.into(),
            op,
            operand: operand.into().into_value(),
        }
    }

    fn matches(&self, record: &Value) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            Operator::Eq => values_equal(actual, &self.operand),
            Operator::Ne => !values_equal(actual, &self.operand),
            Operator::Gt => relational(actual, &self.operand, Ordering::Greater, false),
            Operator::Gte => relational(actual, &self.operand, Ordering::Greater, true),
            Operator::Lt => relational(actual, &self.operand, Ordering::Less, false),
            Operator::Lte => relational(actual, &self.operand, Ordering::Less, true),
            Operator::In => operand_list(&self.operand)
                .iter()
                .any(|candidate| values_equal(actual, candidate)),
            Operator::NotIn => !operand_list(&self.operand)
                .iter()
                .any(|candidate| values_equal(actual, candidate)),
        }
    }
}

/// A conjunction of filter conditions.
///
/// A record matches when every condition matches. An empty filter matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact-match condition.
    pub fn eq(self, field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.push(field, Operator::Eq, operand)
    }

    /// Adds a not-equal condition.
    pub fn ne(self, field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.push(field, Operator::Ne, operand)
    }

    /// Adds a greater-than condition.
    pub fn gt(self, field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.push(field, Operator::Gt, operand)
    }

    /// Adds a greater-or-equal condition.
    pub fn gte(self, field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.push(field, Operator::Gte, operand)
    }

    /// Adds a less-than condition.
    pub fn lt(self, field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.push(field, Operator::Lt, operand)
    }

    /// Adds a less-or-equal condition.
    pub fn lte(self, field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.push(field, Operator::Lte, operand)
    }

    /// Adds a membership condition: the field must equal one of the operands.
    pub fn any_of<I, O>(self, field: impl Into<String>, operands: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand>,
    {
        let list = Value::Array(
            operands
                .into_iter()
                .map(|operand| operand.into().into_value())
                .collect(),
        );
        self.push(field, Operator::In, list)
    }

    /// Adds an exclusion condition: the field must equal none of the operands.
    pub fn none_of<I, O>(self, field: impl Into<String>, operands: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand>,
    {
        let list = Value::Array(
            operands
                .into_iter()
                .map(|operand| operand.into().into_value())
                .collect(),
        );
        self.push(field, Operator::NotIn, list)
    }

    /// Returns true when no conditions have been added.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns true when the record satisfies every condition.
    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|condition| condition.matches(record))
    }

    fn push(mut self, field: impl Into<String>, op: Operator, operand: impl Into<Operand>) -> Self {
        self.conditions.push(Condition::new(field, op, operand));
        self
    }
}

/// Query options for multi-record reads.
///
/// Constructed per call, never persisted.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filter: Filter,
    sort: Vec<String>,
    offset: Option<usize>,
    limit: Option<usize>,
    after_id: Option<RecordId>,
    before_id: Option<RecordId>,
    id_field: Option<String>,
}

impl Query {
    /// Creates an empty query: no filter, no sort, full result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Appends a sort field. A leading `-` sorts descending. Later fields
    /// break ties of earlier ones.
    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort.push(field.into());
        self
    }

    /// Sets the number of records to skip. Ignored when a cursor is given.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the maximum number of records to return.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Starts the page immediately after the record with this identity.
    pub fn after(mut self, id: impl Into<RecordId>) -> Self {
        self.after_id = Some(id.into());
        self
    }

    /// Ends the page just before the record with this identity.
    pub fn before(mut self, id: impl Into<RecordId>) -> Self {
        self.before_id = Some(id.into());
        self
    }

    /// Overrides the identity field consulted by cursors (default `"id"`).
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    /// Runs the query over a loaded record set.
    ///
    /// Steps run in fixed order: filter, sort, cursor/offset, limit.
    pub fn apply(&self, mut records: Vec<Value>) -> Vec<Value> {
        records.retain(|record| self.filter.matches(record));

        if !self.sort.is_empty() {
            sort_records(&mut records, &self.sort);
        }

        let id_field = self.id_field.as_deref().unwrap_or("id");
        let limit = self.limit;
        let mut offset = self.offset.unwrap_or(0);

        if let Some(after) = &self.after_id {
            if let Some(position) = position_of(&records, id_field, after) {
                offset = position + 1;
            }
        }
        if let Some(before) = &self.before_id {
            if let Some(position) = position_of(&records, id_field, before) {
                // Page ending just before the cursor: position - limit,
                // floored at 0. Kept even though rows filtered out ahead of
                // the cursor can shift the page away from it.
                offset = position.saturating_sub(limit.unwrap_or(records.len()));
            }
        }

        records
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }
}

fn position_of(records: &[Value], id_field: &str, id: &RecordId) -> Option<usize> {
    let id = id.as_value();
    records
        .iter()
        .position(|record| values_equal(record.get(id_field).unwrap_or(&Value::Null), &id))
}

/// Stable sort by one or more fields; `-` prefix means descending.
fn sort_records(records: &mut [Value], fields: &[String]) {
    records.sort_by(|a, b| {
        for sort_field in fields {
            let (field, descending) = match sort_field.strip_prefix('-') {
                Some(field) => (field, true),
                None => (sort_field.as_str(), false),
            };
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            let mut ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
            if descending {
                ordering = ordering.reverse();
            }
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Equality with numeric awareness: integers and floats compare by value,
/// everything else structurally.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Natural ordering of same-typed values; mismatched or unordered types are
/// incomparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn relational(actual: &Value, operand: &Value, wanted: Ordering, or_equal: bool) -> bool {
    match compare_values(actual, operand) {
        Some(ordering) => ordering == wanted || (or_equal && ordering == Ordering::Equal),
        None => false,
    }
}

fn operand_list(operand: &Value) -> &[Value] {
    match operand {
        Value::Array(items) => items,
        _ => std::slice::from_ref(operand),
    }
}
