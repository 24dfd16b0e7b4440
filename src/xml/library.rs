// Library-backed converter: quick-xml events folded into a generic JSON tree
//
// Tree conventions:
// - the result is wrapped in the root tag name
// - attributes are grouped under "$"
// - non-whitespace character data is kept verbatim under "_"
// - every child tag maps to an array, even for a single occurrence
// - a text-only element collapses to its string, an empty element to ""
use super::BookingParser;
use crate::error::{BookingError, Result};
use crate::fixtures::{read_document_async, FixtureNaming};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

pub const ATTR_KEY: &str = "$";
pub const CHAR_KEY: &str = "_";

// An element whose end tag has not been seen yet
struct OpenElement {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl OpenElement {
    fn open(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Self> {
        let decoder = reader.decoder();
        let qname = start.name();
        let name = decoder
            .decode(qname.as_ref())
            .map_err(|e| BookingError::Parse(e.to_string()))?
            .into_owned();

        let mut attributes = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| BookingError::Parse(e.to_string()))?;
            let key = decoder
                .decode(attr.key.as_ref())
                .map_err(|e| BookingError::Parse(e.to_string()))?
                .into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| BookingError::Parse(e.to_string()))?
                .into_owned();
            attributes.insert(key, Value::String(value));
        }

        Ok(Self {
            name,
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn push_child(&mut self, name: String, value: Value) {
        let slot = self
            .children
            .entry(name)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = slot {
            items.push(value);
        }
    }

    fn into_value(self) -> Value {
        let has_text = !self.text.trim().is_empty();
        if self.attributes.is_empty() && self.children.is_empty() {
            return if has_text {
                Value::String(self.text)
            } else {
                Value::String(String::new())
            };
        }

        let mut object = Map::new();
        if has_text {
            object.insert(CHAR_KEY.to_string(), Value::String(self.text));
        }
        if !self.attributes.is_empty() {
            object.insert(ATTR_KEY.to_string(), Value::Object(self.attributes));
        }
        object.extend(self.children);
        Value::Object(object)
    }
}

// One of the five predefined entities; a document without a DTD has no others
fn resolve_entity(name: &str) -> Result<String> {
    quick_xml::escape::resolve_predefined_entity(name)
        .map(str::to_string)
        .ok_or_else(|| BookingError::Parse(format!("unknown entity &{};", name)))
}

fn close_element(
    element: OpenElement,
    stack: &mut [OpenElement],
    root: &mut Option<Value>,
) {
    let name = element.name.clone();
    let value = element.into_value();
    match stack.last_mut() {
        Some(parent) => parent.push_child(name, value),
        None => {
            let mut wrapper = Map::new();
            wrapper.insert(name, value);
            *root = Some(Value::Object(wrapper));
        }
    }
}

fn ensure_no_root_yet(root: &Option<Value>, stack: &[OpenElement]) -> Result<()> {
    if root.is_some() && stack.is_empty() {
        return Err(BookingError::Parse(
            "document has more than one root element".to_string(),
        ));
    }
    Ok(())
}

fn append_text(stack: &mut [OpenElement], text: &str) {
    // Character data outside the root element carries no structure
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

pub fn library_tree_from_str(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                ensure_no_root_yet(&root, &stack)?;
                let element = OpenElement::open(&reader, &e)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                ensure_no_root_yet(&root, &stack)?;
                let element = OpenElement::open(&reader, &e)?;
                close_element(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    BookingError::Parse("end tag without matching start tag".to_string())
                })?;
                close_element(element, &mut stack, &mut root);
            }
            Event::Text(e) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| BookingError::Parse(err.to_string()))?;
                append_text(&mut stack, &text);
            }
            Event::CData(e) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| BookingError::Parse(err.to_string()))?;
                append_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                let resolved = match e
                    .resolve_char_ref()
                    .map_err(|err| BookingError::Parse(err.to_string()))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = reader
                            .decoder()
                            .decode(&e)
                            .map_err(|err| BookingError::Parse(err.to_string()))?;
                        resolve_entity(&name)?
                    }
                };
                append_text(&mut stack, &resolved);
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no data
            _ => (),
        }
    }

    if let Some(unclosed) = stack.last() {
        return Err(BookingError::Parse(format!(
            "unexpected end of document inside <{}>",
            unclosed.name
        )));
    }

    root.ok_or_else(|| BookingError::InvalidStructure("document has no root element".to_string()))
}

// Child tag names of one level of a library tree, skipping the "$" and "_" keys
pub fn tree_child_tags(value: &Value) -> Vec<String> {
    match value {
        Value::Object(object) => object
            .keys()
            .filter(|key| key.as_str() != ATTR_KEY && key.as_str() != CHAR_KEY)
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

impl BookingParser {
    #[instrument(skip(self))]
    pub async fn parse_document(&self, confirmation_no: &str) -> Result<Value> {
        let path = self.document_path(confirmation_no, FixtureNaming::Prefixed)?;
        let xml = read_document_async(&path).await?;
        let tree = library_tree_from_str(&xml)?;
        debug!(path = %path.display(), "library converter produced tree");
        Ok(tree)
    }
}
