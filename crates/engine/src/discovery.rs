//! Recursive discovery: flattening a tree into an ordered `path -> value`
//! mapping.
//!
//! Children of sequences (and of coerced scalars) are addressed with
//! `[key]`; children of records with `name` / `.name`. With recursion on, the
//! result holds leaves only, in depth-first order. With recursion off it holds
//! exactly the immediate children, aggregates included.
//!
//! Typed records are the only values that can recurse into themselves from a
//! closed graph, so their type identifiers are tracked per branch in an
//! [`ExclusionSet`]. Record literals and sequences recurse freely.

use std::borrow::Cow;
use std::collections::BTreeSet;

use indexmap::IndexMap;
use payload_types::{Fields, Node, Path, Record, SCALAR_FIELD, Segment};
use tracing::trace;

use crate::adapter::NormalizationAdapter;
use crate::resolver;

/// Ordered mapping from path text to the value found there.
pub type DiscoveryResult = IndexMap<String, Node>;

/// Typed-record identifiers entered along the current branch.
///
/// Extending the set returns a new value; a branch never sees identifiers
/// added by its siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    types: BTreeSet<&'static str>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains(type_name)
    }

    pub fn with(&self, type_name: &'static str) -> Self {
        let mut types = self.types.clone();
        types.insert(type_name);
        Self { types }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Per-call discovery parameters.
#[derive(Debug, Clone)]
pub struct DiscoveryContext {
    pub prefix: Path,
    pub recursive: bool,
    pub exclusions: ExclusionSet,
}

impl DiscoveryContext {
    pub fn new(recursive: bool) -> Self {
        Self {
            prefix: Path::root(),
            recursive,
            exclusions: ExclusionSet::new(),
        }
    }
}

/// Walks a tree rooted at `root`. Emitted paths are relative to `root`; each
/// leaf is checked for readability against its immediate container, and its
/// path text must parse back to the same path.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryEngine<'a> {
    root: &'a Node,
    adapter: &'a dyn NormalizationAdapter,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(root: &'a Node, adapter: &'a dyn NormalizationAdapter) -> Self {
        Self { root, adapter }
    }

    /// Discovers the whole tree with a fresh exclusion set.
    pub fn discover_root(&self, recursive: bool) -> DiscoveryResult {
        self.discover(self.root, &DiscoveryContext::new(recursive))
    }

    pub fn discover(&self, value: &Node, context: &DiscoveryContext) -> DiscoveryResult {
        let mut result = DiscoveryResult::new();
        if value.is_null() {
            return result;
        }

        let exclusions = match value {
            Node::Record(record @ Record::Typed(_)) => {
                let type_name = record.type_name().unwrap_or_default();
                if context.exclusions.contains(type_name) {
                    trace!(path = %context.prefix, type_name, "type already entered on this branch; skipping");
                    return result;
                }
                context.exclusions.with(type_name)
            }
            _ => context.exclusions.clone(),
        };

        let children = self.enumerable_form(value);
        let record_like = matches!(value, Node::Record(_));

        for (key, child) in children.iter() {
            let segment = if record_like {
                Segment::Property(key.clone())
            } else {
                Segment::ArrayIndex(key.clone())
            };
            let readable = resolver::is_readable(value, &Path::root().child(segment.clone()));
            let child_path = context.prefix.child(segment);

            if context.recursive && child.is_aggregate() {
                let nested = DiscoveryContext {
                    prefix: child_path,
                    recursive: true,
                    exclusions: exclusions.clone(),
                };
                result.extend(self.discover(child, &nested));
                continue;
            }

            if !readable {
                continue;
            }
            // Keys whose text parses to a different path (`.`, `[`, `]` or an
            // empty name inside a key) are not addressable and are skipped.
            let text = child_path.to_string();
            if Path::parse(&text).is_ok_and(|parsed| parsed == child_path) {
                result.insert(text, child.clone());
            }
        }

        result
    }

    /// Children of `value` as an ordered field mapping. Literals are borrowed;
    /// everything else goes through the adapter, and values it cannot
    /// normalize are coerced into a one-field record.
    fn enumerable_form<'v>(&self, value: &'v Node) -> Cow<'v, Fields> {
        match value {
            Node::Sequence(sequence) => Cow::Borrowed(sequence.entries()),
            Node::Record(Record::Plain(fields)) => Cow::Borrowed(fields),
            other => Cow::Owned(self.adapter.normalize(other).unwrap_or_else(|| {
                let mut fields = Fields::new();
                fields.insert(SCALAR_FIELD.to_string(), other.clone());
                fields
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FieldNormalizer;
    use payload_types::{FieldAccessor, Sequence};
    use serde_json::json;

    /// Tree node type whose `children` field holds more values of the same type.
    #[derive(Debug, Clone)]
    struct Category {
        name: String,
        parent: Option<Box<Category>>,
    }

    impl FieldAccessor for Category {
        fn field_names(&self) -> Vec<String> {
            vec!["name".into(), "parent".into()]
        }

        fn field(&self, name: &str) -> Option<Node> {
            match name {
                "name" => Some(self.name.clone().into()),
                "parent" => Some(
                    self.parent
                        .as_ref()
                        .map(|parent| Node::typed(parent.as_ref().clone()))
                        .unwrap_or(Node::Null),
                ),
                _ => None,
            }
        }

        fn clone_record(&self) -> Box<dyn FieldAccessor> {
            Box::new(self.clone())
        }
    }

    fn keys(result: &DiscoveryResult) -> Vec<&str> {
        result.keys().map(String::as_str).collect()
    }

    #[test]
    fn recursive_discovery_emits_leaves_depth_first() {
        let root = Node::from(json!({"foo": [{"bar": "qux", "baz": null}], "bar": null}));
        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(true);
        assert_eq!(keys(&result), vec!["foo[0].bar", "foo[0].baz", "bar"]);
        assert!(result.values().all(|value| !value.is_aggregate()));
    }

    #[test]
    fn shallow_discovery_keeps_aggregates() {
        let mut root = Sequence::new();
        root.insert("foo", Node::from(json!([{"bar": "qux"}])));
        root.insert("bar", Node::Null);
        let root = Node::Sequence(root);

        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(false);
        assert_eq!(keys(&result), vec!["[foo]", "[bar]"]);
        assert_eq!(result["[foo]"].kind(), payload_types::NodeKind::Sequence);
    }

    #[test]
    fn empty_containers_contribute_nothing_when_recursing() {
        let root = Node::from(json!({"empty": [], "none": {}, "leaf": 1}));
        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(true);
        assert_eq!(keys(&result), vec!["leaf"]);
    }

    #[test]
    fn repeated_typed_record_on_a_branch_yields_nothing() {
        let leaf = Category {
            name: "leaf".into(),
            parent: Some(Box::new(Category {
                name: "root".into(),
                parent: None,
            })),
        };
        let root = Node::record([("category", Node::typed(leaf))]);
        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(true);
        assert_eq!(keys(&result), vec!["category.name"]);
    }

    #[test]
    fn sibling_branches_do_not_share_exclusions() {
        let category = || Category {
            name: "solo".into(),
            parent: None,
        };
        let root = Node::record([("left", Node::typed(category())), ("right", Node::typed(category()))]);
        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(true);
        assert_eq!(keys(&result), vec!["left.name", "left.parent", "right.name", "right.parent"]);
    }

    #[test]
    fn keys_that_do_not_parse_back_are_skipped() {
        let root = Node::from(json!({"a.b": 1, "x[0]": 2, "": 3, "ok": 4}));
        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(true);
        assert_eq!(keys(&result), vec!["ok"]);

        let mut sequence = Sequence::new();
        sequence.insert("a]b", 1);
        sequence.insert("fine", 2);
        let root = Node::Sequence(sequence);
        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(false);
        assert_eq!(keys(&result), vec!["[fine]"]);
    }

    #[test]
    fn dotted_name_does_not_shadow_nested_field() {
        let root = Node::from(json!({"a.b": 1, "a": {"b": 2}}));
        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(true);
        assert_eq!(result.len(), 1);
        assert_eq!(result["a.b"], Node::from(2));
        assert_eq!(resolver::read(&root, &Path::parse("a.b").unwrap()).as_deref(), Some(&Node::from(2)));
    }

    #[test]
    fn scalar_values_discover_nothing() {
        let root = Node::from("just text");
        let result = DiscoveryEngine::new(&root, &FieldNormalizer).discover_root(true);
        assert!(result.is_empty());
    }

    #[test]
    fn exclusion_set_extension_is_copy_on_write() {
        let base = ExclusionSet::new();
        let extended = base.with("Category");
        assert!(base.is_empty());
        assert!(extended.contains("Category"));
        assert_eq!(extended.len(), 1);
    }
}
