//! Wire-format codecs behind [`StandardAdapter`](crate::StandardAdapter).
//!
//! Each submodule exposes an `encode(&Node, &CodecContext)` / `decode(&str,
//! &CodecContext)` pair. JSON and YAML go through the serde bridge on
//! [`Node`](payload_types::Node); XML and CSV are written and read by hand on
//! top of `quick-xml` and `csv`.

pub mod csv;
pub mod json;
pub mod xml;
pub mod yaml;

use std::path::Path;

use payload_engine::Format;
use thiserror::Error;

/// Failure inside one of the codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("csv: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// The value or document has a shape the codec cannot represent.
    #[error("{0}")]
    Shape(String),
}

impl From<quick_xml::events::attributes::AttrError> for CodecError {
    fn from(error: quick_xml::events::attributes::AttrError) -> Self {
        CodecError::Xml(error.into())
    }
}

/// Infers a format from a file extension (`.yml` counts as YAML).
pub fn format_from_extension(path: &Path) -> Option<Format> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "json" => Some(Format::Json),
        "xml" => Some(Format::Xml),
        "yaml" | "yml" => Some(Format::Yaml),
        "csv" => Some(Format::Csv),
        _ => None,
    }
}
