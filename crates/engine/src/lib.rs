//! # Payload Engine
//!
//! Path-addressed access to schema-less data trees. A [`Payload`] owns one
//! tree of sequences, records and scalars and lets callers read, write and
//! enumerate values inside it with path strings such as `users[0].name`.
//!
//! ## Key Features
//!
//! - **Path access**: `get`, `set`, `is_readable` and `is_writable` over a single grammar where
//!   sequence children are addressed as `[key]` and record fields as `name` / `.name`
//! - **Discovery**: flattening a tree (or a subtree) into an ordered `path -> value` mapping,
//!   either recursively down to the leaves or one level deep
//! - **Typed records**: any type implementing [`FieldAccessor`] can sit inside a tree; repeated
//!   types on one branch are cut off during discovery
//! - **Wire formats**: encoding and parsing through an injected [`NormalizationAdapter`]
//!
//! ## Usage
//!
//! ```rust
//! use payload_engine::{DiscoverOptions, Node, Payload};
//! use serde_json::json;
//!
//! let mut payload = Payload::create(json!({"foo": [{"bar": "qux", "baz": null}], "bar": null}))?;
//!
//! let paths: Vec<String> = payload.discover(&DiscoverOptions::default()).into_keys().collect();
//! assert_eq!(paths, ["foo[0].bar", "foo[0].baz", "bar"]);
//!
//! payload.set("foo[0].baz", "set")?;
//! assert_eq!(payload.get("foo[0].baz", Node::Null), Node::from("set"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`resolver`**: single-path reads and writes against a tree
//! - **`discovery`**: the recursive flattening walk and its exclusion set
//! - **`cache`**: memoized discovery results
//! - **`adapter`**: the normalization and wire-format contract
//! - **`query`**: URL query strings in both directions
//! - **`payload`**: the facade composing all of the above
//!
//! [`FieldAccessor`]: payload_types::FieldAccessor

pub mod adapter;
pub mod cache;
pub mod discovery;
pub mod error;
pub mod payload;
pub mod query;
pub mod resolver;

pub use adapter::{AdapterError, CodecContext, FieldNormalizer, Format, NormalizationAdapter, UnknownFormat};
pub use cache::{DiscoveryKey, ResultCache};
pub use discovery::{DiscoveryContext, DiscoveryEngine, DiscoveryResult, ExclusionSet};
pub use error::PayloadError;
pub use payload::{DiscoverOptions, Payload};
pub use payload_types::{FieldAccessor, FieldError, Node, Path, Record, Sequence};
pub use query::{QueryEncoding, QueryError, QueryOptions, build_http_query, parse_query};
