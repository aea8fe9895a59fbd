//! The `Payload` facade: one owned tree plus the adapter and discovery cache
//! that operate on it.

use std::borrow::Cow;
use std::cell::RefCell;
use std::sync::Arc;

use payload_types::{Node, Path, Sequence};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::{CodecContext, FieldNormalizer, Format, NormalizationAdapter};
use crate::cache::{DiscoveryKey, ResultCache};
use crate::discovery::{DiscoveryEngine, DiscoveryResult};
use crate::error::PayloadError;
use crate::query::{self, QueryOptions};
use crate::resolver::{self, WriteError};

/// Options for [`Payload::discover`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverOptions {
    /// Discover below this path instead of the root. Emitted paths are
    /// relative to it. An empty string means the root.
    pub path: Option<String>,
    pub recursive: bool,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            path: None,
            recursive: true,
        }
    }
}

impl DiscoverOptions {
    /// Immediate children of the root.
    pub fn shallow() -> Self {
        Self {
            path: None,
            recursive: false,
        }
    }

    /// Recursive discovery below `path`.
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            recursive: true,
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn key(&self) -> DiscoveryKey {
        DiscoveryKey {
            path: self.path.clone().filter(|path| !path.is_empty()),
            recursive: self.recursive,
        }
    }
}

/// A data tree addressed by path strings.
///
/// The root is always null, a sequence or a record; scalar roots are
/// rejected on admission. Discovery results are memoized per instance and
/// dropped whenever the tree changes.
#[derive(Debug)]
pub struct Payload {
    root: Node,
    adapter: Arc<dyn NormalizationAdapter>,
    cache: RefCell<ResultCache>,
}

impl Clone for Payload {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            adapter: Arc::clone(&self.adapter),
            cache: RefCell::new(ResultCache::new()),
        }
    }
}

impl Payload {
    /// Wraps `value` using the [`FieldNormalizer`] adapter, which registers no
    /// wire formats.
    pub fn create(value: impl Into<Node>) -> Result<Self, PayloadError> {
        Self::with_adapter(value, Arc::new(FieldNormalizer))
    }

    pub fn with_adapter(value: impl Into<Node>, adapter: Arc<dyn NormalizationAdapter>) -> Result<Self, PayloadError> {
        Ok(Self {
            root: admit(value.into())?,
            adapter,
            cache: RefCell::new(ResultCache::new()),
        })
    }

    /// Builds a payload from a URL query string such as `a[b][]=1&c=2`. A
    /// leading `?` is ignored.
    pub fn from_query(query: &str, adapter: Arc<dyn NormalizationAdapter>) -> Self {
        Self {
            root: Node::Sequence(query::parse_query(query)),
            adapter,
            cache: RefCell::new(ResultCache::new()),
        }
    }

    /// Decodes `data` in the named format.
    pub fn parse(
        data: &str,
        format: &str,
        context: &CodecContext,
        adapter: Arc<dyn NormalizationAdapter>,
    ) -> Result<Self, PayloadError> {
        let format = supported_format(format, adapter.as_ref())?;
        let root = adapter
            .decode(data, format, context)
            .map_err(|source| PayloadError::DecodeFailure { format, source })?;
        Self::with_adapter(root, adapter)
    }

    pub fn parse_json(data: &str, adapter: Arc<dyn NormalizationAdapter>) -> Result<Self, PayloadError> {
        Self::parse(data, Format::Json.as_str(), &CodecContext::default(), adapter)
    }

    pub fn parse_xml(data: &str, adapter: Arc<dyn NormalizationAdapter>) -> Result<Self, PayloadError> {
        Self::parse(data, Format::Xml.as_str(), &CodecContext::default(), adapter)
    }

    pub fn parse_yaml(data: &str, adapter: Arc<dyn NormalizationAdapter>) -> Result<Self, PayloadError> {
        Self::parse(data, Format::Yaml.as_str(), &CodecContext::default(), adapter)
    }

    pub fn parse_csv(data: &str, adapter: Arc<dyn NormalizationAdapter>) -> Result<Self, PayloadError> {
        Self::parse(data, Format::Csv.as_str(), &CodecContext::default(), adapter)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// Swaps in a new root, subject to the same admission as construction.
    pub fn replace_root(&mut self, value: impl Into<Node>) -> Result<(), PayloadError> {
        self.root = admit(value.into())?;
        self.clear_cache();
        Ok(())
    }

    pub fn adapter(&self) -> &Arc<dyn NormalizationAdapter> {
        &self.adapter
    }

    pub fn is_readable(&self, path: &str) -> bool {
        Path::parse(path).is_ok_and(|path| resolver::is_readable(&self.root, &path))
    }

    pub fn is_writable(&self, path: &str) -> bool {
        Path::parse(path).is_ok_and(|path| resolver::is_writable(&self.root, &path))
    }

    /// The value at `path`, or `default` when the path is not readable.
    pub fn get(&self, path: &str, default: impl Into<Node>) -> Node {
        self.lookup(path).map(Cow::into_owned).unwrap_or_else(|| default.into())
    }

    /// The value at `path`, borrowed where the tree allows it.
    pub fn lookup(&self, path: &str) -> Option<Cow<'_, Node>> {
        let path = Path::parse(path).ok()?;
        if path.is_root() {
            return None;
        }
        resolver::read(&self.root, &path)
    }

    /// Writes `value` at `path` and drops every memoized discovery result.
    pub fn set(&mut self, path: &str, value: impl Into<Node>) -> Result<&mut Self, PayloadError> {
        let not_writable = || PayloadError::PathNotWritable { path: path.to_string() };
        let parsed = Path::parse(path).map_err(|_| not_writable())?;
        if !resolver::is_writable(&self.root, &parsed) {
            return Err(not_writable());
        }

        resolver::write(&mut self.root, &parsed, value.into()).map_err(|error| match error {
            WriteError::NotWritable => not_writable(),
            WriteError::Rejected(source) => PayloadError::WriteFailure {
                path: path.to_string(),
                source,
            },
        })?;

        debug!(path, "payload updated; clearing discovery cache");
        self.clear_cache();
        Ok(self)
    }

    /// A new payload rooted at the sequence or record found at `path`,
    /// sharing this payload's adapter.
    pub fn slice(&self, path: &str) -> Result<Self, PayloadError> {
        let value = self.lookup(path).ok_or_else(|| PayloadError::PathNotReadable { path: path.to_string() })?;
        if !value.is_aggregate() {
            return Err(PayloadError::UnsupportedRootType {
                kind: value.type_label(),
            });
        }
        Self::with_adapter(value.into_owned(), Arc::clone(&self.adapter))
    }

    /// Flattens the tree (or the subtree at `options.path`) into an ordered
    /// `path -> value` mapping. An unreadable `options.path` yields an empty
    /// mapping.
    pub fn discover(&self, options: &DiscoverOptions) -> DiscoveryResult {
        let mut cache = self.cache.borrow_mut();
        cache.get_or_compute(options.key(), || self.run_discovery(options)).clone()
    }

    fn run_discovery(&self, options: &DiscoverOptions) -> DiscoveryResult {
        debug!(
            path = options.path.as_deref().unwrap_or_default(),
            recursive = options.recursive,
            "discovery cache miss"
        );
        let sub_root = match options.path.as_deref() {
            None | Some("") => Cow::Borrowed(&self.root),
            Some(path) => match self.lookup(path) {
                Some(value) => value,
                None => return DiscoveryResult::new(),
            },
        };
        DiscoveryEngine::new(&sub_root, self.adapter.as_ref()).discover_root(options.recursive)
    }

    /// Iterates the default recursive discovery.
    pub fn iter(&self) -> indexmap::map::IntoIter<String, Node> {
        self.discover(&DiscoverOptions::default()).into_iter()
    }

    /// True for a null root. Unless `strict`, also true for an empty sequence
    /// and for a record without any discoverable field.
    pub fn is_empty(&self, strict: bool) -> bool {
        match &self.root {
            Node::Null => true,
            _ if strict => false,
            Node::Sequence(sequence) => sequence.is_empty(),
            Node::Record(_) => self.discover(&DiscoverOptions::shallow()).is_empty(),
            _ => false,
        }
    }

    /// Encodes the tree in the named format. CSV receives the flattened,
    /// tabular view of the tree instead of the tree itself.
    pub fn encode(&self, format: &str, context: &CodecContext) -> Result<String, PayloadError> {
        let format = supported_format(format, self.adapter.as_ref())?;
        debug!(%format, "encoding payload");
        let encoded = match format {
            Format::Csv => self.adapter.encode(&self.tabular_view(), format, context),
            _ => self.adapter.encode(&self.root, format, context),
        };
        encoded.map_err(|source| PayloadError::EncodeFailure { format, source })
    }

    pub fn to_json(&self) -> Result<String, PayloadError> {
        self.encode(Format::Json.as_str(), &CodecContext::default())
    }

    pub fn to_xml(&self) -> Result<String, PayloadError> {
        self.encode(Format::Xml.as_str(), &CodecContext::default())
    }

    pub fn to_yaml(&self) -> Result<String, PayloadError> {
        self.encode(Format::Yaml.as_str(), &CodecContext::default())
    }

    pub fn to_csv(&self) -> Result<String, PayloadError> {
        self.encode(Format::Csv.as_str(), &CodecContext::default())
    }

    /// A sequence of flat rows. A sequence of aggregates yields one row per
    /// element; any other tree yields a single row.
    fn tabular_view(&self) -> Node {
        match &self.root {
            Node::Null => Node::Sequence(Sequence::new()),
            Node::Sequence(rows) if !rows.is_empty() && rows.values().all(Node::is_aggregate) => Node::list(
                rows.values()
                    .map(|row| Node::from(DiscoveryEngine::new(row, self.adapter.as_ref()).discover_root(true))),
            ),
            _ => Node::list([Node::from(self.discover(&DiscoverOptions::default()))]),
        }
    }

    pub fn build_http_query(&self, options: &QueryOptions) -> Result<String, PayloadError> {
        Ok(query::build_http_query(&self.root, options)?)
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    #[cfg(test)]
    fn cached_results(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<'a> IntoIterator for &'a Payload {
    type Item = (String, Node);
    type IntoIter = indexmap::map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn admit(value: Node) -> Result<Node, PayloadError> {
    match value {
        Node::Null | Node::Sequence(_) | Node::Record(_) => Ok(value),
        scalar => Err(PayloadError::UnsupportedRootType {
            kind: scalar.type_label(),
        }),
    }
}

fn supported_format(name: &str, adapter: &dyn NormalizationAdapter) -> Result<Format, PayloadError> {
    name.parse::<Format>()
        .ok()
        .filter(|format| adapter.supports_format(*format))
        .ok_or_else(|| PayloadError::UnsupportedFormat { format: name.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn discovery_is_cached_per_request_signature() {
        let payload = Payload::create(json!({"a": {"b": 1}})).unwrap();
        payload.discover(&DiscoverOptions::default());
        payload.discover(&DiscoverOptions::default());
        payload.discover(&DiscoverOptions::shallow());
        payload.discover(&DiscoverOptions::at(""));
        assert_eq!(payload.cached_results(), 2);
    }

    #[test]
    fn set_clears_cache_only_on_success() {
        let mut payload = Payload::create(json!({"a": 1})).unwrap();
        payload.discover(&DiscoverOptions::default());
        assert!(payload.set("[a]", 2).is_err());
        assert_eq!(payload.cached_results(), 1);
        payload.set("a", 2).unwrap();
        assert_eq!(payload.cached_results(), 0);
    }

    #[test]
    fn clones_start_with_an_empty_cache() {
        let payload = Payload::create(json!([1, 2])).unwrap();
        payload.discover(&DiscoverOptions::default());
        let copy = payload.clone();
        assert_eq!(copy.cached_results(), 0);
        assert_eq!(copy.root(), payload.root());
    }
}
