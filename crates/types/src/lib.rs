//! Shared types for payload trees: the [`Node`] value model, the
//! [`FieldAccessor`] capability implemented by typed records, and the
//! [`Path`] addressing scheme.

pub mod accessor;
pub mod node;
pub mod path;
mod serde_bridge;

pub use accessor::{FieldAccessor, FieldError};
pub use node::{Fields, Node, NodeKind, Record, SCALAR_FIELD, Sequence};
pub use path::{Path, PathSyntaxError, Segment};
