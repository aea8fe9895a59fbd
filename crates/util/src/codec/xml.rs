//! XML codec.
//!
//! Encoding wraps the tree in a single document element (`<response>` by
//! default). Record fields and keyed sequence entries become child elements
//! named after their key; a list under a key is written as that element
//! repeated once per item. Keys that are not valid element names, such as
//! list indices, are written as `<item key="...">`. Fields named `@name`
//! become attributes and a field named `#` becomes text content. Null and
//! empty containers are written as empty elements, booleans as `1`/`0`.
//!
//! Decoding reverses this: repeated sibling names collapse into a list,
//! `<item>` children build a keyed sequence, attributes come back as `@name`
//! fields and text next to attributes or children as `#`. Empty elements
//! decode to null and all text decodes to strings.

use indexmap::IndexMap;
use payload_engine::CodecContext;
use payload_types::{Fields, Node, Record, Sequence};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use super::CodecError;

const ITEM_ELEMENT: &str = "item";
const KEY_ATTRIBUTE: &str = "key";
const TEXT_FIELD: &str = "#";
const ATTRIBUTE_PREFIX: char = '@';

pub fn encode(value: &Node, context: &CodecContext) -> Result<String, CodecError> {
    let root_name = context.xml_root_name.as_str();
    if !is_element_name(root_name) {
        return Err(CodecError::Shape(format!("'{root_name}' is not a valid XML element name")));
    }

    let mut out = String::new();
    if context.xml_declaration {
        out.push_str("<?xml version=\"1.0\"?>\n");
    }
    write_element(&mut out, root_name, None, value);
    out.push('\n');
    Ok(out)
}

fn write_element(out: &mut String, name: &str, key: Option<&str>, value: &Node) {
    out.push('<');
    out.push_str(name);
    if let Some(key) = key {
        write_attribute(out, KEY_ATTRIBUTE, key);
    }

    let children = match value {
        Node::Sequence(sequence) => sequence.iter().map(|(key, child)| (key.clone(), child.clone())).collect(),
        Node::Record(Record::Plain(fields)) => fields.clone(),
        Node::Record(record) => record.fields(),
        scalar => {
            match scalar.scalar_text() {
                Some(text) if !text.is_empty() => {
                    out.push('>');
                    out.push_str(&escape(text.as_ref()));
                    close(out, name);
                }
                _ => out.push_str("/>"),
            }
            return;
        }
    };

    let mut body = Vec::with_capacity(children.len());
    for (key, child) in children {
        match key.strip_prefix(ATTRIBUTE_PREFIX) {
            Some(attribute) if is_element_name(attribute) && !child.is_aggregate() => {
                let text = child.scalar_text().unwrap_or_default();
                write_attribute(out, attribute, &text);
            }
            _ => body.push((key, child)),
        }
    }

    if body.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for (key, child) in &body {
        write_child(out, key, child);
    }
    close(out, name);
}

fn write_child(out: &mut String, key: &str, value: &Node) {
    if key == TEXT_FIELD {
        if let Some(text) = value.scalar_text() {
            out.push_str(&escape(text.as_ref()));
        }
        return;
    }

    if !is_element_name(key) {
        write_element(out, ITEM_ELEMENT, Some(key), value);
        return;
    }

    match value {
        Node::Sequence(items) if items.is_list() && !items.is_empty() => {
            for item in items.values() {
                write_element(out, key, None, item);
            }
        }
        _ => write_element(out, key, None, value),
    }
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Conservative XML name check: a letter or `_`, then letters, digits, `-`,
/// `_` or `.`. Namespaced names are not produced.
fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    if name.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("xml")) {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Element being assembled while its end tag is pending.
#[derive(Debug, Default)]
struct PendingElement {
    name: String,
    key: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<(String, Option<String>, Node)>,
    text: String,
}

impl PendingElement {
    fn open(start: &BytesStart<'_>) -> Result<Self, CodecError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut element = PendingElement {
            name,
            ..PendingElement::default()
        };
        for attribute in start.attributes() {
            let attribute = attribute?;
            let attribute_name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            if element.name == ITEM_ELEMENT && attribute_name == KEY_ATTRIBUTE {
                element.key = Some(value);
            } else {
                element.attributes.push((attribute_name, value));
            }
        }
        Ok(element)
    }

    fn into_node(self) -> Node {
        if self.children.is_empty() && self.attributes.is_empty() {
            return if self.text.is_empty() { Node::Null } else { Node::String(self.text) };
        }

        let only_items = self.attributes.is_empty()
            && self.text.is_empty()
            && self.children.iter().all(|(name, _, _)| name == ITEM_ELEMENT);
        if only_items {
            let mut sequence = Sequence::new();
            for (_, key, value) in self.children {
                match key {
                    Some(key) => {
                        sequence.insert(key, value);
                    }
                    None => {
                        sequence.push(value);
                    }
                }
            }
            return Node::Sequence(sequence);
        }

        let mut fields = Fields::new();
        for (name, value) in self.attributes {
            fields.insert(format!("{ATTRIBUTE_PREFIX}{name}"), Node::String(value));
        }
        if !self.text.is_empty() {
            fields.insert(TEXT_FIELD.to_string(), Node::String(self.text));
        }

        let mut grouped: IndexMap<String, Vec<Node>> = IndexMap::new();
        for (name, key, value) in self.children {
            grouped.entry(key.unwrap_or(name)).or_default().push(value);
        }
        for (name, mut values) in grouped {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Node::list(values)
            };
            fields.insert(name, value);
        }
        Node::Record(Record::Plain(fields))
    }
}

/// Decodes a document. The name of the document element is ignored; its
/// content becomes the returned value.
pub fn decode(data: &str, _context: &CodecContext) -> Result<Node, CodecError> {
    let mut reader = Reader::from_str(data);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<PendingElement> = Vec::new();
    let mut document: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(PendingElement::open(&start)?),
            Event::Empty(start) => {
                let element = PendingElement::open(&start)?;
                finish(element, &mut stack, &mut document)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CodecError::Shape("unexpected closing tag".to_string()))?;
                finish(element, &mut stack, &mut document)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CodecError::Shape("document ended inside an element".to_string()));
    }
    document.ok_or_else(|| CodecError::Shape("document has no root element".to_string()))
}

fn finish(element: PendingElement, stack: &mut [PendingElement], document: &mut Option<Node>) -> Result<(), CodecError> {
    let name = element.name.clone();
    let key = element.key.clone();
    let node = element.into_node();
    match stack.last_mut() {
        Some(parent) => parent.children.push((name, key, node)),
        None if document.is_none() => *document = Some(node),
        None => return Err(CodecError::Shape("document has more than one root element".to_string())),
    }
    Ok(())
}
