//! Path resolution against a concrete tree.
//!
//! An `ArrayIndex` segment only resolves against a sequence and a `Property`
//! segment only against a record. Mixing the two makes the path unreadable
//! and unwritable rather than an error, which is how sequence-rooted and
//! record-rooted payloads end up with mutually exclusive path grammars.
//!
//! Reads through a typed record produce owned snapshots, and writes through
//! one are written back with [`FieldAccessor::set_field`] once the nested
//! value has been updated.
//!
//! [`FieldAccessor::set_field`]: payload_types::FieldAccessor::set_field

use std::borrow::Cow;

use payload_types::{FieldError, Node, Path, Record, Segment};

/// Failure of [`write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The path does not lead to a container accepting the assignment.
    NotWritable,
    /// A typed record along the path refused the value.
    Rejected(FieldError),
}

/// True when every segment of `path` can be traversed from `root`.
pub fn is_readable(root: &Node, path: &Path) -> bool {
    !path.is_root() && read(root, path).is_some()
}

/// Resolves `path` against `root`. The root path resolves to `root` itself.
pub fn read<'a>(root: &'a Node, path: &Path) -> Option<Cow<'a, Node>> {
    read_segments(root, path.segments())
}

fn read_segments<'a>(root: &'a Node, segments: &[Segment]) -> Option<Cow<'a, Node>> {
    let mut current = Cow::Borrowed(root);
    for segment in segments {
        current = match current {
            Cow::Borrowed(node) => child(node, segment)?,
            Cow::Owned(node) => Cow::Owned(child(&node, segment)?.into_owned()),
        };
    }
    Some(current)
}

fn child<'a>(node: &'a Node, segment: &Segment) -> Option<Cow<'a, Node>> {
    match (node, segment) {
        (Node::Sequence(sequence), Segment::ArrayIndex(key)) => sequence.get(key).map(Cow::Borrowed),
        (Node::Record(record), Segment::Property(name)) => record.get(name),
        _ => None,
    }
}

/// True when the container owning the last segment exists, has the matching
/// kind and accepts assignment, and every typed record on the way accepts the
/// write-back of its nested field.
pub fn is_writable(root: &Node, path: &Path) -> bool {
    writable_at(root, path.segments())
}

fn writable_at(node: &Node, segments: &[Segment]) -> bool {
    match segments {
        [] => false,
        [last] => accepts(node, last),
        [first, rest @ ..] => {
            let Some(next) = child(node, first) else {
                return false;
            };
            let write_back = match node {
                Node::Record(Record::Typed(record)) => record.is_field_writable(first.key()),
                _ => true,
            };
            write_back && writable_at(&next, rest)
        }
    }
}

fn accepts(node: &Node, segment: &Segment) -> bool {
    match (node, segment) {
        (Node::Sequence(_), Segment::ArrayIndex(_)) => true,
        (Node::Record(Record::Plain(_)), Segment::Property(_)) => true,
        (Node::Record(Record::Typed(record)), Segment::Property(name)) => record.is_field_writable(name),
        _ => false,
    }
}

/// Writes `value` at `path`, modifying the owning container in place.
pub fn write(root: &mut Node, path: &Path, value: Node) -> Result<(), WriteError> {
    write_at(root, path.segments(), value)
}

fn write_at(node: &mut Node, segments: &[Segment], value: Node) -> Result<(), WriteError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err(WriteError::NotWritable);
    };

    if rest.is_empty() {
        return assign(node, segment, value);
    }

    match (node, segment) {
        (Node::Sequence(sequence), Segment::ArrayIndex(key)) => {
            let next = sequence.get_mut(key).ok_or(WriteError::NotWritable)?;
            write_at(next, rest, value)
        }
        (Node::Record(Record::Plain(fields)), Segment::Property(name)) => {
            let next = fields.get_mut(name).ok_or(WriteError::NotWritable)?;
            write_at(next, rest, value)
        }
        (Node::Record(Record::Typed(record)), Segment::Property(name)) => {
            let mut next = record.field(name).ok_or(WriteError::NotWritable)?;
            write_at(&mut next, rest, value)?;
            record.set_field(name, next).map_err(WriteError::Rejected)
        }
        _ => Err(WriteError::NotWritable),
    }
}

fn assign(node: &mut Node, segment: &Segment, value: Node) -> Result<(), WriteError> {
    match (node, segment) {
        (Node::Sequence(sequence), Segment::ArrayIndex(key)) => {
            sequence.insert(key.clone(), value);
            Ok(())
        }
        (Node::Record(Record::Plain(fields)), Segment::Property(name)) => {
            fields.insert(name.clone(), value);
            Ok(())
        }
        (Node::Record(Record::Typed(record)), Segment::Property(name)) => {
            record.set_field(name, value).map_err(WriteError::Rejected)
        }
        _ => Err(WriteError::NotWritable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payload_types::{FieldAccessor, Sequence};
    use serde_json::json;

    fn path(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    #[derive(Debug, Clone)]
    struct Account {
        id: i64,
        owner: Node,
    }

    impl FieldAccessor for Account {
        fn field_names(&self) -> Vec<String> {
            vec!["id".into(), "owner".into()]
        }

        fn field(&self, name: &str) -> Option<Node> {
            match name {
                "id" => Some(self.id.into()),
                "owner" => Some(self.owner.clone()),
                _ => None,
            }
        }

        fn is_field_writable(&self, name: &str) -> bool {
            name == "owner"
        }

        fn set_field(&mut self, name: &str, value: Node) -> Result<(), FieldError> {
            match name {
                "owner" if value.is_aggregate() => {
                    self.owner = value;
                    Ok(())
                }
                "owner" => Err(FieldError::invalid_value(name, "record", &value)),
                _ => Err(FieldError::ReadOnly { field: name.to_string() }),
            }
        }

        fn clone_record(&self) -> Box<dyn FieldAccessor> {
            Box::new(self.clone())
        }
    }

    fn keyed_root() -> Node {
        let mut root = Sequence::new();
        root.insert("foo", Node::from(json!([{"bar": "qux", "baz": null}])));
        root.insert("bar", Node::Null);
        Node::Sequence(root)
    }

    #[test]
    fn segment_kind_must_match_container_kind() {
        let record_root = Node::from(json!({"foo": [{"bar": "qux"}]}));
        assert!(is_readable(&record_root, &path("foo")));
        assert!(is_readable(&record_root, &path("foo[0].bar")));
        assert!(!is_readable(&record_root, &path("[foo]")));
        assert!(!is_readable(&record_root, &path("foo.0.bar")));

        let sequence_root = keyed_root();
        assert!(is_readable(&sequence_root, &path("[foo][0].bar")));
        assert!(!is_readable(&sequence_root, &path("foo")));
    }

    #[test]
    fn missing_children_are_unreadable_but_writable() {
        let root = keyed_root();
        assert!(!is_readable(&root, &path("[missing]")));
        assert!(is_writable(&root, &path("[missing]")));
        assert!(!is_writable(&root, &path("[missing][deeper]")));
        assert!(!is_writable(&root, &path("[bar][x]")));
    }

    #[test]
    fn writes_in_place_through_nested_containers() {
        let mut root = keyed_root();
        write(&mut root, &path("[foo][0].bar"), Node::from("changed")).unwrap();
        assert_eq!(read(&root, &path("[foo][0].bar")).as_deref(), Some(&Node::from("changed")));
    }

    #[test]
    fn writes_back_through_typed_records() {
        let mut root = Node::record([(
            "account",
            Node::typed(Account {
                id: 7,
                owner: Node::from(json!({"name": "ada"})),
            }),
        )]);

        assert!(is_writable(&root, &path("account.owner.name")));
        assert!(!is_writable(&root, &path("account.id")));
        write(&mut root, &path("account.owner.name"), Node::from("grace")).unwrap();
        assert_eq!(read(&root, &path("account.owner.name")).as_deref(), Some(&Node::from("grace")));
    }

    #[test]
    fn typed_record_rejection_is_reported() {
        let mut root = Node::record([(
            "account",
            Node::typed(Account {
                id: 7,
                owner: Node::Null,
            }),
        )]);
        let result = write(&mut root, &path("account.owner"), Node::from("scalar"));
        assert!(matches!(result, Err(WriteError::Rejected(FieldError::InvalidValue { .. }))));
    }
}
