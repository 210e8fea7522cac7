//! Minimal XML tree for round-tripping package parts.
//!
//! Parts are parsed into elements, text and opaque raw nodes (comments,
//! processing instructions, CDATA), edited, and written back. Everything the
//! writer does not touch comes out as it went in, modulo attribute quoting
//! and entity spelling.

use deckgen_core::{Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Write;

/// DrawingML main namespace.
pub(crate) const NS_DRAWINGML: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// PresentationML main namespace.
pub(crate) const NS_PRESENTATIONML: &str =
    "http://schemas.openxmlformats.org/presentationml/2006/main";

/// A node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Element(Element),
    /// Unescaped character data.
    Text(String),
    /// Markup written back verbatim.
    Raw(String),
}

/// An element with its attributes in document order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A parsed part: prolog (declaration, comments) and root element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlDocument {
    pub prolog: Vec<Node>,
    pub root: Element,
}

impl XmlDocument {
    /// Parse a part.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut prolog = Vec::new();
        let mut root = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::XmlError(format!("at position {}: {}", reader.buffer_position(), e))
            })?;

            let node = match event {
                Event::Start(ref e) => {
                    stack.push(start_element(e)?);
                    continue;
                }
                Event::Empty(ref e) => Node::Element(start_element(e)?),
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::XmlError("unbalanced end tag".to_string()))?;
                    Node::Element(element)
                }
                Event::Text(ref e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::XmlError(e.to_string()))?
                        .into_owned();
                    Node::Text(text)
                }
                Event::CData(e) => Node::Raw(format!(
                    "<![CDATA[{}]]>",
                    String::from_utf8_lossy(&e.into_inner())
                )),
                Event::Comment(ref e) => Node::Raw(format!("<!--{}-->", String::from_utf8_lossy(e))),
                Event::Decl(ref e) => Node::Raw(format!("<?{}?>", String::from_utf8_lossy(e))),
                Event::PI(ref e) => Node::Raw(format!("<?{}?>", String::from_utf8_lossy(e))),
                Event::DocType(ref e) => {
                    Node::Raw(format!("<!DOCTYPE {}>", String::from_utf8_lossy(e)))
                }
                Event::Eof => break,
            };

            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => match node {
                    Node::Element(element) if root.is_none() => root = Some(element),
                    // Anything after the root element is dropped.
                    _ if root.is_some() => {}
                    other => prolog.push(other),
                },
            }
        }

        if !stack.is_empty() {
            return Err(Error::XmlError("unexpected end of document".to_string()));
        }
        let root = root.ok_or_else(|| Error::XmlError("document has no root element".to_string()))?;

        Ok(Self { prolog, root })
    }

    /// Serialize the part.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.prolog {
            write_node(node, &mut out);
        }
        write_element(&self.root, &mut out);
        out
    }

    /// Prefix bound to `namespace` on the root element, if any.
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.root
            .attributes
            .iter()
            .find(|(_, v)| v == namespace)
            .and_then(|(k, _)| k.strip_prefix("xmlns:"))
    }
}

fn start_element(e: &BytesStart) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::XmlError(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::XmlError(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(element) => write_element(element, out),
        Node::Text(text) => out.push_str(&escape(text.as_str())),
        Node::Raw(raw) => out.push_str(raw),
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Namespace prefix of the element name, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace an attribute's value, or append the attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) {
        self.attributes.retain(|(k, _)| k != key);
    }

    /// Child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.local_name() == local)
    }

    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.local_name() == local => Some(e),
            _ => None,
        })
    }

    /// Follow a path of local names through first matching children.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, local| el.child(local))
    }

    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        let mut current = self;
        for local in path {
            current = current.child_mut(local)?;
        }
        Some(current)
    }

    /// First descendant with the given local name, depth first.
    pub fn descendant(&self, local: &str) -> Option<&Element> {
        self.elements().find_map(|e| {
            if e.local_name() == local {
                Some(e)
            } else {
                e.descendant(local)
            }
        })
    }

    /// Visit this element and every descendant element.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Element)) {
        visit(self);
        for child in self.elements() {
            child.walk(visit);
        }
    }

    /// Positions in `children` of child elements with the given local name.
    pub fn positions(&self, local: &str) -> Vec<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n, Node::Element(e) if e.local_name() == local))
            .map(|(i, _)| i)
            .collect()
    }

    /// The element child at a position in `children`.
    pub fn element_at_mut(&mut self, pos: usize) -> Option<&mut Element> {
        match self.children.get_mut(pos) {
            Some(Node::Element(e)) => Some(e),
            _ => None,
        }
    }

    /// The first child with the given local name. When there is none, the
    /// element built by `make` is inserted at `index` (clamped) first.
    pub fn ensure_child(
        &mut self,
        local: &str,
        index: usize,
        make: impl FnOnce() -> Element,
    ) -> &mut Element {
        let pos = match self.positions(local).first() {
            Some(&pos) => pos,
            None => {
                let pos = index.min(self.children.len());
                self.children.insert(pos, Node::Element(make()));
                pos
            }
        };
        match &mut self.children[pos] {
            Node::Element(element) => element,
            Node::Text(_) | Node::Raw(_) => unreachable!("positions() only yields elements"),
        }
    }

    /// Concatenated character data of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) => collect_text(e, out),
            Node::Raw(_) => {}
        }
    }
}

/// Extract the local name from a potentially namespaced XML name.
pub(crate) fn local_name(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

/// Qualify a local name with an optional prefix.
pub(crate) fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}
