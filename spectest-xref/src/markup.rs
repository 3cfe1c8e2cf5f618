//! A small owned markup tree: XHTML in, HTML5 out.
//!
//! The prose standard is read from its XHTML rendition, annotated in place,
//! and written back as HTML5. Only elements, text and comments are kept;
//! declarations and processing instructions are dropped on read.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use spectest::{SpecError, SpecResult};
use std::fmt::Write;

/// Elements whose text content is written without escaping.
const RAW_TEXT: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Elements serialized without children or an end tag.
const VOID: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "link", "meta", "param", "spacer", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Concatenated text of this node and all its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => el.children.iter().for_each(|c| c.collect_text(out)),
            Node::Comment(_) => {}
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace an attribute in place, or append it.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.children.iter().for_each(|c| c.collect_text(&mut out));
        out
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children
            .iter()
            .filter_map(Node::as_element)
            .find(|el| el.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|el| el.name == name)
    }

    /// Remove every descendant element carrying `class`. Returns how many
    /// were removed.
    pub fn strip_class(&mut self, class: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|c| !matches!(c, Node::Element(el) if el.has_class(class)));
        let mut removed = before - self.children.len();
        for child in self.children.iter_mut().filter_map(Node::as_element_mut) {
            removed += child.strip_class(class);
        }
        removed
    }
}

/// A parsed document: its root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Read an XHTML document.
    pub fn parse_xhtml(source: &str) -> SpecResult<Self> {
        let mut reader = Reader::from_str(source);
        let mut open: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| markup_error(reader.error_position(), e))?;
            let position = reader.buffer_position();

            match event {
                Event::Start(start) => open.push(element_from(&start, position)?),
                Event::Empty(start) => {
                    let el = element_from(&start, position)?;
                    attach(&mut open, &mut root, Node::Element(el), position)?;
                }
                Event::End(_) => {
                    let el = open
                        .pop()
                        .ok_or_else(|| markup_error(position, "unbalanced end tag"))?;
                    attach(&mut open, &mut root, Node::Element(el), position)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| markup_error(position, e))?;
                    push_text(&mut open, &text);
                }
                Event::CData(data) => {
                    push_text(&mut open, &String::from_utf8_lossy(&data));
                }
                Event::Comment(comment) => {
                    if let Some(parent) = open.last_mut() {
                        let comment = String::from_utf8_lossy(&comment).into_owned();
                        parent.children.push(Node::Comment(comment));
                    }
                }
                Event::Eof => break,
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        if let Some(el) = open.last() {
            return Err(markup_error(
                reader.buffer_position(),
                format!("unclosed element <{}>", el.name),
            ));
        }

        root.map(Document::new)
            .ok_or_else(|| markup_error(reader.buffer_position(), "no root element"))
    }

    pub fn head_mut(&mut self) -> Option<&mut Element> {
        self.root.child_mut("head")
    }

    pub fn body(&self) -> Option<&Element> {
        self.root.child("body")
    }

    pub fn body_mut(&mut self) -> Option<&mut Element> {
        self.root.child_mut("body")
    }

    /// Append a stylesheet link to `<head>`.
    pub fn add_stylesheet(&mut self, href: &str) {
        if let Some(head) = self.head_mut() {
            head.children.push(Node::Element(
                Element::new("link")
                    .with_attribute("rel", "stylesheet")
                    .with_attribute("href", href)
                    .with_attribute("type", "text/css"),
            ));
        }
    }

    /// Turn XHTML-isms into their HTML5 equivalents: drop `xmlns`, copy
    /// `xml:lang` into `lang` and declare the charset first in `<head>`.
    pub fn prepare_for_html(&mut self) {
        self.root.remove_attribute("xmlns");
        if let Some(lang) = self.root.attribute("xml:lang").map(str::to_string) {
            self.root.set_attribute("lang", lang);
        }
        if let Some(head) = self.head_mut() {
            head.children.insert(
                0,
                Node::Element(Element::new("meta").with_attribute("charset", "UTF-8")),
            );
        }
    }

    /// Serialize as HTML5.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE HTML>\n");
        write_element(&mut out, &self.root, false);
        out
    }
}

fn markup_error(position: u64, err: impl std::fmt::Display) -> SpecError {
    SpecError::Markup {
        position,
        message: err.to_string(),
    }
}

fn element_from(start: &BytesStart<'_>, position: u64) -> SpecResult<Element> {
    let mut el = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| markup_error(position, e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| markup_error(position, e))?;
        el.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(el)
}

fn attach(
    open: &mut [Element],
    root: &mut Option<Element>,
    node: Node,
    position: u64,
) -> SpecResult<()> {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => match node {
            Node::Element(el) if root.is_none() => *root = Some(el),
            _ => return Err(markup_error(position, "content after the root element")),
        },
    }
    Ok(())
}

/// Text outside the root element is insignificant whitespace and dropped.
fn push_text(open: &mut [Element], text: &str) {
    if let Some(parent) = open.last_mut() {
        match parent.children.last_mut() {
            Some(Node::Text(prev)) => prev.push_str(text),
            _ => parent.children.push(Node::Text(text.to_string())),
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn write_element(out: &mut String, el: &Element, raw: bool) {
    write!(out, "<{}", el.name).unwrap();
    for (name, value) in &el.attributes {
        write!(out, " {}=\"{}\"", name, escape_html(value)).unwrap();
    }
    out.push('>');

    if VOID.contains(&el.name.as_str()) {
        return;
    }

    let raw = raw || RAW_TEXT.contains(&el.name.as_str());
    for child in &el.children {
        match child {
            Node::Element(child) => write_element(out, child, raw),
            Node::Text(text) if raw => out.push_str(text),
            Node::Text(text) => out.push_str(&escape_html(text)),
            Node::Comment(comment) => {
                write!(out, "<!--{}-->", comment).unwrap();
            }
        }
    }
    write!(out, "</{}>", el.name).unwrap();
}
