use payload_engine::{AdapterError, CodecContext, Format, NormalizationAdapter};
use payload_types::Node;

use crate::codec::{self, CodecError};

/// Normalization adapter with codecs for every [`Format`].
///
/// Typed records are normalized through their readable fields, the default
/// behavior of [`NormalizationAdapter::normalize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAdapter;

impl StandardAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl NormalizationAdapter for StandardAdapter {
    fn supports_format(&self, _format: Format) -> bool {
        true
    }

    fn encode(&self, value: &Node, format: Format, context: &CodecContext) -> Result<String, AdapterError> {
        let encoded = match format {
            Format::Json => codec::json::encode(value, context),
            Format::Xml => codec::xml::encode(value, context),
            Format::Yaml => codec::yaml::encode(value, context),
            Format::Csv => codec::csv::encode(value, context),
        };
        encoded.map_err(boxed)
    }

    fn decode(&self, data: &str, format: Format, context: &CodecContext) -> Result<Node, AdapterError> {
        let decoded = match format {
            Format::Json => codec::json::decode(data, context),
            Format::Xml => codec::xml::decode(data, context),
            Format::Yaml => codec::yaml::decode(data, context),
            Format::Csv => codec::csv::decode(data, context),
        };
        decoded.map_err(boxed)
    }
}

fn boxed(error: CodecError) -> AdapterError {
    Box::new(error)
}
