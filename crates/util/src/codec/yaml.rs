use payload_engine::CodecContext;
use payload_types::Node;

use super::CodecError;

pub fn encode(value: &Node, _context: &CodecContext) -> Result<String, CodecError> {
    Ok(serde_yaml::to_string(value)?)
}

/// An empty document decodes to null.
pub fn decode(data: &str, _context: &CodecContext) -> Result<Node, CodecError> {
    if data.trim().is_empty() {
        return Ok(Node::Null);
    }
    Ok(serde_yaml::from_str(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_nested_mappings_in_order() {
        let node = decode("zeta: 1\nalpha:\n  - x\n  - y\n", &CodecContext::default()).unwrap();
        let record = node.as_record().unwrap().fields();
        assert_eq!(record.keys().collect::<Vec<_>>(), ["zeta", "alpha"]);
        assert!(record["alpha"].as_sequence().unwrap().is_list());
    }

    #[test]
    fn blank_documents_are_null() {
        assert_eq!(decode("  \n", &CodecContext::default()).unwrap(), Node::Null);
    }
}
