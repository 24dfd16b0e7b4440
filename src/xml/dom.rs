// Custom DOM-walking converter: roxmltree element tree folded into ParsedNode
use super::BookingParser;
use crate::error::Result;
use crate::fixtures::{read_document, FixtureNaming};
use roxmltree::{Document, Node, ParsingOptions};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, instrument};

// Reserved JSON key for an element's text; never a valid tag or attribute name
pub const TEXT_KEY: &str = "#text";

/// One converted XML element.
///
/// Attributes and children are kept in document order. A child tag seen once
/// is stored as [`Children::One`]; the second occurrence promotes it to
/// [`Children::Many`], so the shape follows discovery order rather than a pre-scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedNode {
    attributes: Vec<(String, String)>,
    children: Vec<(String, Children)>,
    text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Children {
    One(ParsedNode),
    Many(Vec<ParsedNode>),
}

impl Children {
    pub fn as_slice(&self) -> &[ParsedNode] {
        match self {
            Children::One(node) => std::slice::from_ref(node),
            Children::Many(nodes) => nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParsedNode> {
        self.as_slice().iter()
    }

    fn push(&mut self, node: ParsedNode) {
        let nodes = match std::mem::replace(self, Children::Many(Vec::new())) {
            Children::One(existing) => vec![existing, node],
            Children::Many(mut nodes) => {
                nodes.push(node);
                nodes
            }
        };
        *self = Children::Many(nodes);
    }
}

impl ParsedNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn child(&self, tag: &str) -> Option<&Children> {
        self.children
            .iter()
            .find(|(key, _)| key == tag)
            .map(|(_, children)| children)
    }

    pub fn child_tags(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(key, _)| key.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty() && self.text.is_none()
    }

    fn insert_child(&mut self, tag: &str, node: ParsedNode) {
        match self.children.iter_mut().find(|(key, _)| key == tag) {
            Some((_, existing)) => existing.push(node),
            None => self.children.push((tag.to_string(), Children::One(node))),
        }
    }
}

// Attributes, then children in first-seen order, then "#text". A child sharing
// its name with an attribute wins the JSON key.
impl Serialize for ParsedNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let attributes: Vec<&(String, String)> = self
            .attributes
            .iter()
            .filter(|(name, _)| self.child(name).is_none())
            .collect();
        let len = attributes.len() + self.children.len() + usize::from(self.text.is_some());

        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in attributes {
            map.serialize_entry(name, value)?;
        }
        for (tag, children) in &self.children {
            map.serialize_entry(tag, children)?;
        }
        if let Some(text) = &self.text {
            map.serialize_entry(TEXT_KEY, text)?;
        }
        map.end()
    }
}

// Names are taken from the source text so prefixes survive as written ("h:guest")
fn qualified_name<'input>(element: Node<'_, 'input>) -> &'input str {
    let source = &element.document().input_text()[element.range()];
    source
        .trim_start_matches('<')
        .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .next()
        .unwrap_or_default()
}

// roxmltree resolves xmlns declarations instead of listing them as attributes,
// so the ones introduced by this element are restored here
fn declared_namespaces(element: Node<'_, '_>) -> Vec<(String, String)> {
    let inherited: Vec<(Option<&str>, &str)> = element
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    element
        .namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| {
            let name = match ns.name() {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            (name, ns.uri().to_string())
        })
        .collect()
}

fn convert_element(element: Node<'_, '_>) -> ParsedNode {
    let mut node = ParsedNode {
        attributes: declared_namespaces(element),
        ..ParsedNode::default()
    };

    let input = element.document().input_text();
    for attribute in element.attributes() {
        node.attributes.push((
            input[attribute.range_qname()].to_string(),
            attribute.value().to_string(),
        ));
    }

    for child in element.children() {
        if child.is_element() {
            node.insert_child(qualified_name(child), convert_element(child));
        } else if child.is_text() {
            // Last non-empty text node wins
            if let Some(text) = child.text().map(str::trim).filter(|t| !t.is_empty()) {
                node.text = Some(text.to_string());
            }
        }
    }

    node
}

pub fn parsed_node_from_str(xml: &str) -> Result<ParsedNode> {
    // Doctypes are accepted; roxmltree refuses them unless asked
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options)?;
    Ok(convert_element(document.root_element()))
}

impl BookingParser {
    #[instrument(skip(self))]
    pub fn parse_document_custom(&self, confirmation_no: &str) -> Result<ParsedNode> {
        let path = self.document_path(confirmation_no, FixtureNaming::Prefixed)?;
        let xml = read_document(&path)?;
        let node = parsed_node_from_str(&xml)?;
        debug!(
            path = %path.display(),
            children = node.children.len(),
            "dom converter produced node"
        );
        Ok(node)
    }
}
