//! The narrow capability contract the engine needs from the outside world:
//! normalizing non-enumerable values into field mappings, and encoding or
//! decoding whole trees in a named wire format.
//!
//! Adapters are constructed explicitly and handed to each payload; there is
//! no process-wide instance.

use std::fmt;
use std::str::FromStr;

use payload_types::{Fields, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised by an adapter during encoding or decoding. Callers wrap it
/// with the format that failed.
pub type AdapterError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Wire formats a payload can be encoded to and parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Xml,
    Yaml,
    Csv,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Json, Format::Xml, Format::Yaml, Format::Csv];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Yaml => "yaml",
            Format::Csv => "csv",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format name outside of [`Format::ALL`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown format '{0}'")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            "yaml" => Ok(Format::Yaml),
            "csv" => Ok(Format::Csv),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Options passed through to encoders and decoders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecContext {
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// Name of the XML document element.
    pub xml_root_name: String,
    /// Emit `<?xml version="1.0"?>` before the document element.
    pub xml_declaration: bool,
    /// CSV field delimiter; must be ASCII.
    pub csv_delimiter: char,
}

impl Default for CodecContext {
    fn default() -> Self {
        Self {
            pretty: false,
            xml_root_name: "response".to_string(),
            xml_declaration: true,
            csv_delimiter: ',',
        }
    }
}

/// Normalization and wire-format capability consumed by payloads.
pub trait NormalizationAdapter: fmt::Debug + Send + Sync {
    /// Field mapping for a value that is not a sequence or record literal,
    /// or `None` when the value cannot be normalized. The default exposes the
    /// readable fields of typed records.
    fn normalize(&self, value: &Node) -> Option<Fields> {
        match value {
            Node::Record(record) if !record.is_plain() => Some(record.fields()),
            _ => None,
        }
    }

    /// Whether an encoder/decoder is registered for `format`.
    fn supports_format(&self, format: Format) -> bool;

    fn encode(&self, value: &Node, format: Format, context: &CodecContext) -> Result<String, AdapterError>;

    fn decode(&self, data: &str, format: Format, context: &CodecContext) -> Result<Node, AdapterError>;
}

/// Adapter that normalizes typed records and registers no wire formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldNormalizer;

impl NormalizationAdapter for FieldNormalizer {
    fn supports_format(&self, _format: Format) -> bool {
        false
    }

    fn encode(&self, _value: &Node, format: Format, _context: &CodecContext) -> Result<String, AdapterError> {
        Err(format!("no encoder registered for {format}").into())
    }

    fn decode(&self, _data: &str, format: Format, _context: &CodecContext) -> Result<Node, AdapterError> {
        Err(format!("no decoder registered for {format}").into())
    }
}
