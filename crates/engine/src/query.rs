//! URL query strings: building one from a tree and parsing one into a tree.
//!
//! Nested keys use bracket notation (`foo[0][bar]=qux`), matching what web
//! frameworks accept for form and query parameters.

use payload_types::{Node, Record, Sequence};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `application/x-www-form-urlencoded` keeps alphanumerics and `-_.`.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// RFC 3986 additionally keeps `~`.
const RFC3986_ENCODE_SET: &AsciiSet = &FORM_ENCODE_SET.remove(b'~');

/// Percent-encoding flavour for [`build_http_query`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryEncoding {
    /// Spaces become `+`.
    #[default]
    Rfc1738,
    /// Spaces become `%20`.
    Rfc3986,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Prepended to numeric top-level keys.
    pub numeric_prefix: Option<String>,
    /// Pair separator; `&` when unset.
    pub separator: Option<String>,
    pub encoding: QueryEncoding,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("a {0} value cannot be rendered as a query string")]
    UnsupportedRoot(&'static str),
    #[error("query separator must not be empty")]
    EmptySeparator,
}

/// Renders `root` as a query string. Null leaves are skipped, booleans render
/// as `1`/`0`, and empty containers produce no pairs.
pub fn build_http_query(root: &Node, options: &QueryOptions) -> Result<String, QueryError> {
    if !root.is_aggregate() {
        return Err(QueryError::UnsupportedRoot(root.type_label()));
    }
    let separator = options.separator.as_deref().unwrap_or("&");
    if separator.is_empty() {
        return Err(QueryError::EmptySeparator);
    }

    let mut pairs = Vec::new();
    for (key, value) in children(root) {
        let key = match &options.numeric_prefix {
            Some(prefix) if !key.is_empty() && key.bytes().all(|byte| byte.is_ascii_digit()) => format!("{prefix}{key}"),
            _ => key,
        };
        collect_pairs(&key, &value, options.encoding, &mut pairs);
    }
    Ok(pairs.join(separator))
}

fn children(node: &Node) -> Vec<(String, Node)> {
    match node {
        Node::Sequence(sequence) => sequence.iter().map(|(key, value)| (key.clone(), value.clone())).collect(),
        Node::Record(Record::Plain(fields)) => fields.iter().map(|(key, value)| (key.clone(), value.clone())).collect(),
        Node::Record(record) => record.fields().into_iter().collect(),
        _ => Vec::new(),
    }
}

fn collect_pairs(key: &str, value: &Node, encoding: QueryEncoding, pairs: &mut Vec<String>) {
    if value.is_aggregate() {
        for (child_key, child) in children(value) {
            collect_pairs(&format!("{key}[{child_key}]"), &child, encoding, pairs);
        }
        return;
    }
    if value.is_null() {
        return;
    }
    if let Some(text) = value.scalar_text() {
        pairs.push(format!("{}={}", encode_component(key, encoding), encode_component(&text, encoding)));
    }
}

fn encode_component(text: &str, encoding: QueryEncoding) -> String {
    match encoding {
        QueryEncoding::Rfc1738 => text
            .split(' ')
            .map(|part| utf8_percent_encode(part, FORM_ENCODE_SET).to_string())
            .collect::<Vec<_>>()
            .join("+"),
        QueryEncoding::Rfc3986 => utf8_percent_encode(text, RFC3986_ENCODE_SET).to_string(),
    }
}

/// Parses a query string into a keyed sequence. `a[b][]=c` nests, an empty
/// bracket appends, and a later duplicate key overwrites an earlier one.
pub fn parse_query(query: &str) -> Sequence {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut root = Sequence::new();
    for (raw_key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let Some((base, subkeys)) = split_key(&raw_key) else {
            continue;
        };
        insert_nested(&mut root, &base, &subkeys, Node::String(value.into_owned()));
    }
    root
}

/// Splits `a[b][]` into `("a", ["b", ""])`. Spaces and dots in the base name
/// become `_`, as does an unmatched `[`, after which the text is kept as is.
/// Keys with an empty base name are dropped.
fn split_key(raw: &str) -> Option<(String, Vec<String>)> {
    let raw = raw.trim_start();
    let open = raw.find('[');
    let mut base: String = raw[..open.unwrap_or(raw.len())]
        .chars()
        .map(|c| if matches!(c, ' ' | '.') { '_' } else { c })
        .collect();
    if base.is_empty() {
        return None;
    }

    let mut rest = "";
    if let Some(open) = open {
        if raw[open..].contains(']') {
            rest = &raw[open..];
        } else {
            base.push('_');
            base.push_str(&raw[open + 1..]);
        }
    }

    let mut subkeys = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            break;
        };
        subkeys.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    Some((base, subkeys))
}

fn insert_nested(container: &mut Sequence, key: &str, subkeys: &[String], value: Node) {
    let Some((next, rest)) = subkeys.split_first() else {
        if key.is_empty() {
            container.push(value);
        } else {
            container.insert(key, value);
        }
        return;
    };

    let key = if key.is_empty() { container.push(Node::Null) } else { key.to_string() };
    let slot = container.get_mut(&key);
    let child = match slot {
        Some(Node::Sequence(child)) => child,
        _ => {
            container.insert(key.clone(), Sequence::new());
            match container.get_mut(&key) {
                Some(Node::Sequence(child)) => child,
                _ => return,
            }
        }
    };
    insert_nested(child, next, rest, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nests_keys_with_brackets() {
        let root = Node::from(json!({"foo": [{"bar": "qux", "baz": null}], "bar": null}));
        let query = build_http_query(&root, &QueryOptions::default()).unwrap();
        assert_eq!(query, "foo%5B0%5D%5Bbar%5D=qux");
    }

    #[test]
    fn applies_prefix_separator_and_encoding() {
        let root = Node::list(vec![Node::from("a b"), Node::from(true)]);
        let options = QueryOptions {
            numeric_prefix: Some("n".into()),
            separator: Some(";".into()),
            encoding: QueryEncoding::Rfc3986,
        };
        assert_eq!(build_http_query(&root, &options).unwrap(), "n0=a%20b;n1=1");

        let plain = build_http_query(&root, &QueryOptions::default()).unwrap();
        assert_eq!(plain, "0=a+b&1=1");
    }

    #[test]
    fn scalar_roots_are_rejected() {
        assert_eq!(
            build_http_query(&Node::from(3), &QueryOptions::default()),
            Err(QueryError::UnsupportedRoot("number"))
        );
        assert_eq!(build_http_query(&Node::Null, &QueryOptions::default()), Err(QueryError::UnsupportedRoot("null")));
    }

    #[test]
    fn parses_bracketed_keys_into_sequences() {
        let root = parse_query("?user[name]=ada&user[tags][]=x&user[tags][]=y&page=2&flag");
        let user = root.get("user").and_then(Node::as_sequence).unwrap();
        assert_eq!(user.get("name"), Some(&Node::from("ada")));
        let tags = user.get("tags").and_then(Node::as_sequence).unwrap();
        assert!(tags.is_list());
        assert_eq!(tags.get("1"), Some(&Node::from("y")));
        assert_eq!(root.get("page"), Some(&Node::from("2")));
        assert_eq!(root.get("flag"), Some(&Node::from("")));
    }

    #[test]
    fn later_duplicates_overwrite_and_plus_decodes_to_space() {
        let root = parse_query("q=first&q=second+word");
        assert_eq!(root.get("q"), Some(&Node::from("second word")));
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn out_of_range_index_keeps_earlier_appends() {
        let root = parse_query("a[]=x&a[18446744073709551615]=y&a[]=z");
        let a = root.get("a").and_then(Node::as_sequence).unwrap();
        assert_eq!(a.get("0"), Some(&Node::from("x")));
        assert_eq!(a.get("18446744073709551615"), Some(&Node::from("y")));
        assert_eq!(a.get("1"), Some(&Node::from("z")));
    }

    #[test]
    fn unmatched_bracket_becomes_underscore() {
        let root = parse_query("a[b.c=1");
        assert_eq!(root.get("a_b.c"), Some(&Node::from("1")));
    }

    #[test]
    fn base_names_replace_dots_and_spaces() {
        let root = parse_query("first.name=ada&last+name=lovelace&a.b[c.d]=1&[x]=dropped");
        assert_eq!(root.get("first_name"), Some(&Node::from("ada")));
        assert_eq!(root.get("last_name"), Some(&Node::from("lovelace")));
        let nested = root.get("a_b").and_then(Node::as_sequence).unwrap();
        assert_eq!(nested.get("c.d"), Some(&Node::from("1")));
        assert_eq!(root.len(), 3);
    }
}
