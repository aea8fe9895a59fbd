//! Tree values held by a payload.
//!
//! A [`Node`] is either a scalar, an ordered keyed [`Sequence`] or a named-field
//! [`Record`]. Conversion from host values (JSON documents, typed structs) into
//! this shape happens once, at the boundary, so the path and discovery code can
//! branch on a stable discriminant instead of inspecting values at runtime.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::accessor::FieldAccessor;

/// Ordered field mapping used by records and normalized values.
pub type Fields = IndexMap<String, Node>;

/// Field name used when a bare scalar is coerced into a one-field record.
pub const SCALAR_FIELD: &str = "scalar";

/// Stable discriminant of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// String, number, boolean or null.
    Scalar,
    /// Ordered, key-indexed children addressed with `[key]`.
    Sequence,
    /// Named-field children addressed with `name` / `.name`.
    Record,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Sequence => "sequence",
            NodeKind::Record => "record",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in a payload tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Sequence),
    Record(Record),
}

impl Node {
    /// Builds a list-shaped sequence (`"0".."n-1"` keys) from the given items.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Node>,
    {
        Node::Sequence(items.into_iter().map(Into::<Node>::into).collect())
    }

    /// Builds a plain record from `(name, value)` pairs, keeping their order.
    pub fn record<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Node>,
    {
        Node::Record(Record::Plain(
            fields.into_iter().map(|(name, value)| (name.into(), value.into())).collect(),
        ))
    }

    /// Wraps a typed record.
    pub fn typed(record: impl FieldAccessor + 'static) -> Self {
        Node::Record(Record::typed(record))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Null | Node::Bool(_) | Node::Number(_) | Node::String(_) => NodeKind::Scalar,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Record(_) => NodeKind::Record,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// True for sequences and records.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Node::Sequence(_) | Node::Record(_))
    }

    /// Short label used in diagnostics (`null`, `bool`, `sequence`, ...).
    pub fn type_label(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Sequence(_) => "sequence",
            Node::Record(_) => "record",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Node::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Node::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Text form of a scalar as used by the flat wire formats (query strings,
    /// XML text, CSV cells). Booleans render as `1`/`0` and null as an empty
    /// string. Returns `None` for aggregates.
    pub fn scalar_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Node::Null => Some(Cow::Borrowed("")),
            Node::Bool(true) => Some(Cow::Borrowed("1")),
            Node::Bool(false) => Some(Cow::Borrowed("0")),
            Node::Number(number) => Some(Cow::Owned(number.to_string())),
            Node::String(value) => Some(Cow::Borrowed(value)),
            Node::Sequence(_) | Node::Record(_) => None,
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Number(value.into())
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Number(value.into())
    }
}

impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Node::Number(value.into())
    }
}

impl From<f64> for Node {
    /// Non-finite floats have no wire representation and become `Null`.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map(Node::Number).unwrap_or(Node::Null)
    }
}

impl From<Number> for Node {
    fn from(value: Number) -> Self {
        Node::Number(value)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Node::Null)
    }
}

impl From<Sequence> for Node {
    fn from(value: Sequence) -> Self {
        Node::Sequence(value)
    }
}

impl From<Record> for Node {
    fn from(value: Record) -> Self {
        Node::Record(value)
    }
}

impl From<Fields> for Node {
    fn from(value: Fields) -> Self {
        Node::Record(Record::Plain(value))
    }
}

/// JSON arrays become list sequences and JSON objects become plain records.
impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(flag) => Node::Bool(flag),
            Value::Number(number) => Node::Number(number),
            Value::String(text) => Node::String(text),
            Value::Array(items) => Node::list(items),
            Value::Object(map) => Node::record(map),
        }
    }
}

/// Ordered container whose children are addressed by key (`[key]`).
///
/// Keys are strings so that both list-shaped (`[0]`, `[1]`) and keyed
/// (`[foo]`) sequences share one representation. Appending with [`push`]
/// uses one past the largest non-negative integer key seen so far. A key too
/// large to have a successor counts as a plain string key.
///
/// [`push`]: Sequence::push
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    entries: IndexMap<String, Node>,
    next_index: usize,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces the child at `key`, keeping the original position
    /// of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        let key = key.into();
        if let Ok(index) = key.parse::<usize>()
            && index >= self.next_index
            && index.to_string() == key
            && let Some(next) = index.checked_add(1)
        {
            self.next_index = next;
        }
        self.entries.insert(key, value.into())
    }

    /// Appends a child at the next free integer key and returns that key.
    pub fn push(&mut self, value: impl Into<Node>) -> String {
        let key = self.next_index.to_string();
        self.insert(key.clone(), value);
        key
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Node> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Node> {
        self.entries.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, Node> {
        self.entries.values()
    }

    /// Children in insertion order, keyed as they are addressed.
    pub fn entries(&self) -> &IndexMap<String, Node> {
        &self.entries
    }

    /// True when keys are exactly `"0".."n-1"` in order.
    pub fn is_list(&self) -> bool {
        self.entries.keys().enumerate().all(|(index, key)| key.parse::<usize>().ok() == Some(index) && index.to_string() == *key)
    }
}

impl FromIterator<Node> for Sequence {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut sequence = Sequence::new();
        for item in iter {
            sequence.push(item);
        }
        sequence
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Sequence {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        let mut sequence = Sequence::new();
        for (key, value) in iter {
            sequence.insert(key, value);
        }
        sequence
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = (&'a String, &'a Node);
    type IntoIter = indexmap::map::Iter<'a, String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Named-field container.
///
/// `Plain` is a record literal whose fields are stored inline. `Typed` holds an
/// externally defined record type that exposes its fields through
/// [`FieldAccessor`]; reads through it yield owned snapshots of field values.
pub enum Record {
    Plain(Fields),
    Typed(Box<dyn FieldAccessor>),
}

impl Record {
    /// Empty record literal.
    pub fn new() -> Self {
        Record::Plain(Fields::new())
    }

    pub fn typed(record: impl FieldAccessor + 'static) -> Self {
        Record::Typed(Box::new(record))
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Record::Plain(_))
    }

    /// Identifier of a typed record's type; `None` for record literals.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Record::Plain(_) => None,
            Record::Typed(record) => Some(record.type_name()),
        }
    }

    /// Reads a readable field.
    pub fn get(&self, name: &str) -> Option<Cow<'_, Node>> {
        match self {
            Record::Plain(fields) => fields.get(name).map(Cow::Borrowed),
            Record::Typed(record) => record.field(name).map(Cow::Owned),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            Record::Plain(fields) => fields.contains_key(name),
            Record::Typed(record) => record.field(name).is_some(),
        }
    }

    /// Snapshot of the readable fields in declaration order.
    pub fn fields(&self) -> Fields {
        match self {
            Record::Plain(fields) => fields.clone(),
            Record::Typed(record) => record
                .field_names()
                .into_iter()
                .filter_map(|name| record.field(&name).map(|value| (name, value)))
                .collect(),
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Record::new()
    }
}

impl Clone for Record {
    fn clone(&self) -> Self {
        match self {
            Record::Plain(fields) => Record::Plain(fields.clone()),
            Record::Typed(record) => Record::Typed(record.clone_record()),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Plain(fields) => f.debug_map().entries(fields.iter()).finish(),
            Record::Typed(record) => fmt::Debug::fmt(record, f),
        }
    }
}

/// Typed records compare equal when they share a type and their readable
/// fields match; a typed record never equals a record literal.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Record::Plain(left), Record::Plain(right)) => left == right,
            (Record::Typed(left), Record::Typed(right)) => {
                left.type_name() == right.type_name() && self.fields() == other.fields()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_continues_after_largest_integer_key() {
        let mut sequence = Sequence::new();
        sequence.insert("foo", "a");
        sequence.insert("5", "b");
        assert_eq!(sequence.push("c"), "6");
        assert!(!sequence.is_list());
    }

    #[test]
    fn largest_integer_key_does_not_move_the_append_position() {
        let max = usize::MAX.to_string();
        let mut sequence = Sequence::new();
        assert_eq!(sequence.push("x"), "0");
        sequence.insert(max.as_str(), "y");
        assert_eq!(sequence.push("z"), "1");
        assert_eq!(sequence.get("0"), Some(&Node::from("x")));
        assert_eq!(sequence.get(&max), Some(&Node::from("y")));
        assert_eq!(sequence.len(), 3);
    }

    #[test]
    fn list_detection_requires_consecutive_keys() {
        let list = Sequence::from_iter(vec![Node::from(1), Node::from(2)]);
        assert!(list.is_list());

        let mut gaps = Sequence::new();
        gaps.insert("0", 1);
        gaps.insert("2", 2);
        assert!(!gaps.is_list());

        let mut padded = Sequence::new();
        padded.insert("00", 1);
        assert!(!padded.is_list());
    }

    #[test]
    fn converts_json_objects_to_records_and_arrays_to_lists() {
        let node = Node::from(json!({"foo": [1, "two"], "bar": null}));
        let record = node.as_record().expect("record");
        assert!(record.is_plain());
        let foo = record.get("foo").expect("foo");
        assert_eq!(foo.kind(), NodeKind::Sequence);
        assert!(foo.as_sequence().expect("sequence").is_list());
        assert_eq!(record.get("bar").as_deref(), Some(&Node::Null));
    }

    #[test]
    fn scalar_text_renders_flat_forms() {
        assert_eq!(Node::Bool(true).scalar_text().as_deref(), Some("1"));
        assert_eq!(Node::Null.scalar_text().as_deref(), Some(""));
        assert_eq!(Node::from(2.5).scalar_text().as_deref(), Some("2.5"));
        assert!(Node::list(vec![1]).scalar_text().is_none());
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(Node::from(f64::NAN), Node::Null);
    }
}
