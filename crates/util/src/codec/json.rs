use payload_engine::CodecContext;
use payload_types::Node;

use super::CodecError;

pub fn encode(value: &Node, context: &CodecContext) -> Result<String, CodecError> {
    let encoded = if context.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(encoded)
}

pub fn decode(data: &str, _context: &CodecContext) -> Result<Node, CodecError> {
    Ok(serde_json::from_str(data)?)
}
