//! Field access capability for externally defined record types.

use std::fmt;

use thiserror::Error;

use crate::node::Node;

/// Error returned when a typed record refuses a field assignment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    /// The field exists but cannot be assigned.
    #[error("field '{field}' is read-only")]
    ReadOnly { field: String },
    /// The record has no such field.
    #[error("unknown field '{field}'")]
    Unknown { field: String },
    /// The value does not fit the field's type.
    #[error("field '{field}' expects {expected}, got {actual}")]
    InvalidValue {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl FieldError {
    /// Convenience constructor for type mismatches.
    pub fn invalid_value(field: &str, expected: &'static str, actual: &Node) -> Self {
        FieldError::InvalidValue {
            field: field.to_string(),
            expected,
            actual: actual.type_label(),
        }
    }
}

/// Read/write/enumerate access to the named fields of a typed record.
///
/// Implementors are host types that live inside a payload tree without being
/// converted into record literals. Discovery enumerates them through
/// [`field_names`](FieldAccessor::field_names) and uses
/// [`type_name`](FieldAccessor::type_name) as the identity for cycle guarding,
/// so two values of the same Rust type share one identifier.
pub trait FieldAccessor: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Names of the readable fields, in declaration order.
    fn field_names(&self) -> Vec<String>;

    /// Current value of a readable field; `None` when the field is missing or hidden.
    fn field(&self, name: &str) -> Option<Node>;

    fn is_field_writable(&self, _name: &str) -> bool {
        false
    }

    fn set_field(&mut self, name: &str, _value: Node) -> Result<(), FieldError> {
        Err(FieldError::ReadOnly { field: name.to_string() })
    }

    fn clone_record(&self) -> Box<dyn FieldAccessor>;
}
