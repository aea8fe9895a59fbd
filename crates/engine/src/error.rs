use payload_types::FieldError;
use thiserror::Error;

use crate::adapter::{AdapterError, Format};
use crate::query::QueryError;

/// Errors surfaced by [`Payload`](crate::Payload) operations.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("path '{path}' is not readable")]
    PathNotReadable { path: String },

    #[error("path '{path}' is not writable")]
    PathNotWritable { path: String },

    #[error("write to '{path}' was rejected")]
    WriteFailure {
        path: String,
        #[source]
        source: FieldError,
    },

    #[error("unsupported format '{format}'")]
    UnsupportedFormat { format: String },

    #[error("failed to encode payload as {format}")]
    EncodeFailure {
        format: Format,
        #[source]
        source: AdapterError,
    },

    #[error("failed to decode {format} data")]
    DecodeFailure {
        format: Format,
        #[source]
        source: AdapterError,
    },

    #[error("a {kind} value cannot back a payload")]
    UnsupportedRootType { kind: &'static str },

    #[error("failed to build query string: {0}")]
    QueryBuildFailure(#[from] QueryError),
}

impl PayloadError {
    /// The path involved in the failure, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            PayloadError::PathNotReadable { path } | PayloadError::PathNotWritable { path } | PayloadError::WriteFailure { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}
