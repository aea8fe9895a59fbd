//! `serde` support for [`Node`], shared by every self-describing wire format.
//!
//! List-shaped sequences serialize as sequences; keyed sequences and records
//! serialize as maps. On the way back, sequences become list sequences and
//! maps become record literals.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

use crate::node::{Fields, Node, Record, Sequence};

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(flag) => serializer.serialize_bool(*flag),
            Node::Number(number) => number.serialize(serializer),
            Node::String(text) => serializer.serialize_str(text),
            Node::Sequence(sequence) => sequence.serialize(serializer),
            Node::Record(record) => record.serialize(serializer),
        }
    }
}

impl Serialize for Sequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_list() {
            let mut seq = serializer.serialize_seq(Some(self.len()))?;
            for value in self.values() {
                seq.serialize_element(value)?;
            }
            seq.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self.iter() {
                map.serialize_entry(key, value)?;
            }
            map.end()
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Record::Plain(fields) => serialize_fields(fields, serializer),
            Record::Typed(_) => serialize_fields(&self.fields(), serializer),
        }
    }
}

fn serialize_fields<S: Serializer>(fields: &Fields, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (name, value) in fields {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any self-describing value")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Node, E> {
        Ok(Node::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Node, E> {
        Ok(Node::Number(value.into()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Node, E> {
        Ok(Node::Number(value.into()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Node, E> {
        Ok(Number::from_f64(value).map(Node::Number).unwrap_or(Node::Null))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Node, E> {
        Ok(Node::String(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Node, E> {
        Ok(Node::String(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        let mut sequence = Sequence::new();
        while let Some(item) = access.next_element::<Node>()? {
            sequence.push(item);
        }
        Ok(Node::Sequence(sequence))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        let mut fields = Fields::new();
        while let Some((MapKey(key), value)) = access.next_entry::<MapKey, Node>()? {
            fields.insert(key, value);
        }
        Ok(Node::Record(Record::Plain(fields)))
    }
}

/// Map key accepting any scalar, stringified. YAML documents routinely use
/// integer and boolean keys.
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MapKeyVisitor)
    }
}

struct MapKeyVisitor;

impl<'de> Visitor<'de> for MapKeyVisitor {
    type Value = MapKey;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a scalar map key")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<MapKey, E> {
        Ok(MapKey(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<MapKey, E> {
        Ok(MapKey(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<MapKey, E> {
        Ok(MapKey(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<MapKey, E> {
        Ok(MapKey(value.to_string()))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<MapKey, E> {
        Ok(MapKey(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<MapKey, E> {
        Ok(MapKey(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<MapKey, E> {
        Ok(MapKey(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::FieldAccessor;
    use serde_json::json;

    #[derive(Debug, Clone)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl FieldAccessor for Point {
        fn field_names(&self) -> Vec<String> {
            vec!["x".into(), "y".into()]
        }

        fn field(&self, name: &str) -> Option<Node> {
            match name {
                "x" => Some(self.x.into()),
                "y" => Some(self.y.into()),
                _ => None,
            }
        }

        fn clone_record(&self) -> Box<dyn FieldAccessor> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn list_sequences_serialize_as_arrays() {
        let node = Node::from(json!({"foo": [{"bar": "qux", "baz": null}], "bar": null}));
        let text = serde_json::to_string(&node).unwrap();
        assert_eq!(text, r#"{"foo":[{"bar":"qux","baz":null}],"bar":null}"#);
    }

    #[test]
    fn keyed_sequences_serialize_as_objects() {
        let mut sequence = Sequence::new();
        sequence.insert("foo", 1);
        sequence.insert("bar", Node::Null);
        let text = serde_json::to_string(&Node::Sequence(sequence)).unwrap();
        assert_eq!(text, r#"{"foo":1,"bar":null}"#);
    }

    #[test]
    fn typed_records_serialize_their_readable_fields() {
        let node = Node::typed(Point { x: 1, y: 2 });
        assert_eq!(serde_json::to_string(&node).unwrap(), r#"{"x":1,"y":2}"#);
    }

    #[test]
    fn deserializes_maps_as_records_preserving_order() {
        let node: Node = serde_json::from_str(r#"{"z": 1, "a": [true, 2.5]}"#).unwrap();
        let record = node.as_record().unwrap();
        let names: Vec<_> = record.fields().keys().cloned().collect();
        assert_eq!(names, vec!["z", "a"]);
        assert_eq!(record.get("a").unwrap().as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn yaml_integer_keys_are_stringified() {
        let node: Node = serde_yaml::from_str("1: one\ntrue: yes\n").unwrap();
        let record = node.as_record().unwrap();
        assert_eq!(record.get("1").unwrap().as_str(), Some("one"));
        assert!(record.contains("true"));
    }
}
