//! CSV codec.
//!
//! Encoding expects a sequence of rows. Each row is flattened with recursive
//! discovery, so nested values end up in columns named by their path
//! (`address.city`, `tags[0]`). The header is the union of all row columns in
//! first-seen order; missing cells are left empty.
//!
//! Decoding yields a list of records with string cells keyed by header. Column
//! names are kept verbatim, so nesting flattened on the way out is not rebuilt.

use indexmap::IndexSet;
use payload_engine::{CodecContext, DiscoveryEngine, DiscoveryResult, FieldNormalizer};
use payload_types::{Fields, Node, Record, Sequence};

use super::CodecError;

pub fn encode(value: &Node, context: &CodecContext) -> Result<String, CodecError> {
    let delimiter = delimiter(context)?;
    let rows: Vec<DiscoveryResult> = match value {
        Node::Null => Vec::new(),
        Node::Sequence(rows) => rows.values().map(flatten_row).collect::<Result<_, _>>()?,
        Node::Record(_) => vec![flatten_row(value)?],
        scalar => {
            return Err(CodecError::Shape(format!("a {} value cannot be written as CSV", scalar.type_label())));
        }
    };
    if rows.is_empty() {
        return Ok(String::new());
    }

    let mut headers: IndexSet<&str> = IndexSet::new();
    for row in &rows {
        headers.extend(row.keys().map(String::as_str));
    }

    let mut writer = ::csv::WriterBuilder::new().delimiter(delimiter).from_writer(Vec::new());
    writer.write_record(headers.iter())?;
    for row in &rows {
        let cells = headers.iter().map(|header| {
            row.get(*header)
                .and_then(Node::scalar_text)
                .map(|text| text.into_owned())
                .unwrap_or_default()
        });
        writer.write_record(cells)?;
    }

    let bytes = writer.into_inner().map_err(|error| CodecError::Io(error.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn flatten_row(row: &Node) -> Result<DiscoveryResult, CodecError> {
    if !row.is_aggregate() {
        let mut single = DiscoveryResult::new();
        single.insert("0".to_string(), row.clone());
        return Ok(single);
    }
    Ok(DiscoveryEngine::new(row, &FieldNormalizer).discover_root(true))
}

pub fn decode(data: &str, context: &CodecContext) -> Result<Node, CodecError> {
    let delimiter = delimiter(context)?;
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Sequence::new();
    for record in reader.records() {
        let record = record?;
        let fields: Fields = headers
            .iter()
            .enumerate()
            .map(|(index, header)| (header.to_string(), Node::from(record.get(index).unwrap_or_default())))
            .collect();
        rows.push(Node::Record(Record::Plain(fields)));
    }
    Ok(Node::Sequence(rows))
}

fn delimiter(context: &CodecContext) -> Result<u8, CodecError> {
    u8::try_from(context.csv_delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CodecError::Shape(format!("CSV delimiter {:?} is not an ASCII character", context.csv_delimiter)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_rows_and_unions_headers() {
        let rows = Node::from(json!([
            {"name": "ada", "address": {"city": "London"}},
            {"name": "grace", "active": true}
        ]));
        assert_eq!(
            encode(&rows, &CodecContext::default()).unwrap(),
            "name,address.city,active\nada,London,\ngrace,,1\n"
        );
    }

    #[test]
    fn quotes_cells_that_need_it() {
        let rows = Node::from(json!([{"note": "a, b", "quote": "say \"hi\""}]));
        assert_eq!(
            encode(&rows, &CodecContext::default()).unwrap(),
            "note,quote\n\"a, b\",\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn decodes_rows_as_string_records() {
        let context = CodecContext {
            csv_delimiter: ';',
            ..CodecContext::default()
        };
        let decoded = decode("id;name\n1;ada\n2;grace\n", &context).unwrap();
        assert_eq!(decoded, Node::from(json!([{"id": "1", "name": "ada"}, {"id": "2", "name": "grace"}])));
    }

    #[test]
    fn empty_input_round_trips_to_no_rows() {
        assert_eq!(encode(&Node::Null, &CodecContext::default()).unwrap(), "");
        assert_eq!(decode("", &CodecContext::default()).unwrap(), Node::Sequence(Sequence::new()));
    }

    #[test]
    fn rejects_non_ascii_delimiters_and_scalars() {
        let context = CodecContext {
            csv_delimiter: '¦',
            ..CodecContext::default()
        };
        assert!(matches!(encode(&Node::Null, &context), Err(CodecError::Shape(_))));
        assert!(matches!(
            encode(&Node::from("text"), &CodecContext::default()),
            Err(CodecError::Shape(_))
        ));
    }
}
