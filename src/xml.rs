//! Owned, namespace-resolved XML element tree.
//!
//! Every element records the URI its name resolved to, the prefix it was
//! spelled with, and the namespace declarations it carried, so a tree can
//! be serialized back with the same prefixes it was read with.

use std::borrow::Cow;

use quick_xml::NsReader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};

use crate::error::{GpxError, Result};
use crate::namespace::{NamespaceMap, XML_NAMESPACE};

#[derive(Debug, Clone)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub name: String,
    pub value: String,
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.name == other.name && self.value == other.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element and its subtree. `Clone` is a deep copy.
///
/// Equality is namespace-aware: prefixes and declarations are spelling,
/// not content, and are ignored.
#[derive(Debug, Clone)]
pub struct Element {
    namespace: Option<String>,
    prefix: Option<String>,
    name: String,
    attributes: Vec<Attribute>,
    declarations: NamespaceMap,
    children: Vec<Node>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.name == other.name
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Element {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            prefix: None,
            name: name.to_string(),
            attributes: Vec::new(),
            declarations: NamespaceMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    /// Parses a complete document and returns its root element.
    pub fn parse(xml: &str) -> Result<Element> {
        parse_document(xml)
    }

    /// Serializes this element as a standalone document.
    pub fn to_xml_string(&self) -> Result<String> {
        crate::serializer::to_string(self, &crate::serializer::WriteOptions::default())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn is(&self, namespace: Option<&str>, name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.name == name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Unqualified attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attribute_ns(None, name)
    }

    pub fn attribute_ns(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == namespace && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.set_attribute_ns(None, None, name, value);
    }

    pub fn set_attribute_ns(
        &mut self,
        namespace: Option<&str>,
        prefix: Option<&str>,
        name: &str,
        value: impl Into<String>,
    ) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.as_deref() == namespace && a.name == name)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                namespace: namespace.map(str::to_string),
                prefix: prefix.map(str::to_string),
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Moves an attribute to the front, keeping the relative order of the rest.
    pub fn hoist_attribute(&mut self, name: &str) {
        if let Some(idx) = self
            .attributes
            .iter()
            .position(|a| a.namespace.is_none() && a.name == name)
        {
            let attr = self.attributes.remove(idx);
            self.attributes.insert(0, attr);
        }
    }

    pub fn declarations(&self) -> &NamespaceMap {
        &self.declarations
    }

    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        self.declarations.insert(prefix, uri);
    }

    pub fn set_declarations(&mut self, declarations: NamespaceMap) {
        self.declarations = declarations;
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First direct child with the given qualified name.
    pub fn find_child(&self, namespace: Option<&str>, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(namespace, name))
    }

    /// All direct children with the given qualified name, in document order.
    pub fn children_named<'a>(
        &'a self,
        namespace: Option<&'a str>,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> {
        self.child_elements().filter(move |e| e.is(namespace, name))
    }

    pub fn push_element(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    pub fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(existing)) = self.children.last_mut() {
            existing.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Removes and returns the `index`-th child element.
    pub fn remove_child_element(&mut self, index: usize) -> Option<Element> {
        let pos = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Element(_)))
            .nth(index)
            .map(|(pos, _)| pos)?;
        match self.children.remove(pos) {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn retain_children(&mut self, mut keep: impl FnMut(&Element) -> bool) {
        self.children.retain(|node| match node {
            Node::Element(e) => keep(e),
            _ => true,
        });
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                text.push_str(t);
            }
        }
        text
    }

    /// Replaces the direct text content, leaving child elements in place.
    pub fn set_text(&mut self, text: &str) {
        self.children.retain(|node| !matches!(node, Node::Text(_)));
        self.children.insert(0, Node::Text(text.to_string()));
    }

    /// This element and all of its descendants in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First element in this subtree (itself included) matching `pred`.
    pub fn find_descendant_mut(
        &mut self,
        pred: &dyn Fn(&Element) -> bool,
    ) -> Option<&mut Element> {
        if pred(self) {
            return Some(self);
        }
        for child in self.child_elements_mut() {
            if let Some(found) = child.find_descendant_mut(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Drops whitespace-only text between child elements.
    fn normalize(&mut self) {
        let has_elements = self
            .children
            .iter()
            .any(|node| matches!(node, Node::Element(_)));
        if has_elements {
            self.children.retain(|node| match node {
                Node::Text(t) => !t.trim().is_empty(),
                _ => true,
            });
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let children: Vec<&Element> = next.child_elements().collect();
        self.stack.extend(children.into_iter().rev());
        Some(next)
    }
}

fn utf8(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn bound_namespace(resolved: ResolveResult<'_>, raw: &[u8]) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(utf8(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => {
            log::debug!("unresolved prefix in <{}>", utf8(raw));
            Err(GpxError::UnknownPrefix(utf8(&prefix).into_owned()))
        }
    }
}

fn start_element(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Element> {
    let (resolved, local) = reader.resolver().resolve_element(start.name());
    let namespace = bound_namespace(resolved, start.name().as_ref())?;
    let mut element = Element::new(namespace.as_deref(), &utf8(local.as_ref()));
    element.prefix = start
        .name()
        .prefix()
        .map(|p| utf8(p.as_ref()).into_owned());

    for attr in start.attributes() {
        let attr = attr?;
        let value = unescape(&utf8(&attr.value))?.into_owned();
        if let Some(binding) = attr.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => None,
                PrefixDeclaration::Named(p) => Some(utf8(p).into_owned()),
            };
            element.declarations.insert(prefix.as_deref(), &value);
            continue;
        }
        let prefix = attr.key.prefix().map(|p| utf8(p.as_ref()).into_owned());
        let namespace = if prefix.as_deref() == Some("xml") {
            Some(XML_NAMESPACE.to_string())
        } else {
            let (resolved, _) = reader.resolver().resolve_attribute(attr.key);
            bound_namespace(resolved, attr.key.as_ref())?
        };
        element.attributes.push(Attribute {
            namespace,
            prefix,
            name: utf8(attr.key.local_name().as_ref()).into_owned(),
            value,
        });
    }

    Ok(element)
}

fn push_general_ref(stack: &mut [Element], e: &BytesRef<'_>) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    // Character references (&#60; &#x3C;) and predefined entities
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        current.push_text(ch.encode_utf8(&mut [0; 4]));
        return;
    }
    let name = utf8(e.as_ref());
    let resolved = match name.as_ref() {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        other => {
            log::warn!("skipping unknown entity &{other};");
            return;
        }
    };
    current.push_text(resolved);
}

fn close(stack: &mut Vec<Element>, root: &mut Option<Element>, mut element: Element) {
    element.normalize();
    match stack.last_mut() {
        Some(parent) => parent.push_element(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = start_element(&reader, &e)?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let element = start_element(&reader, &e)?;
                close(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    close(&mut stack, &mut root, element);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&utf8(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&utf8(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => push_general_ref(&mut stack, &e),
            Ok(Event::Comment(e)) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .children
                        .push(Node::Comment(utf8(e.as_ref()).into_owned()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::Xml(e)),
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(GpxError::UnexpectedEof(open.name.clone()));
    }
    root.ok_or(GpxError::EmptyDocument)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_namespaces_and_prefixes() {
        let xml = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" xmlns:t="urn:test" creator="X">
  <wpt lat="1" lon="2"><t:hr>142</t:hr></wpt>
</gpx>"#;
        let root = Element::parse(xml).unwrap();
        assert_eq!(root.name(), "gpx");
        assert_eq!(root.namespace(), Some("http://www.topografix.com/GPX/1/1"));
        assert_eq!(root.attribute("creator"), Some("X"));
        assert_eq!(root.declarations().get(Some("t")), Some("urn:test"));

        let wpt = root
            .find_child(Some("http://www.topografix.com/GPX/1/1"), "wpt")
            .unwrap();
        let hr = wpt.find_child(Some("urn:test"), "hr").unwrap();
        assert_eq!(hr.prefix(), Some("t"));
        assert_eq!(hr.text(), "142");
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = r#"<a><b>Fish &amp; Chips &#60;3 <![CDATA[<raw>]]></b><c v="1 &lt; 2"/></a>"#;
        let root = Element::parse(xml).unwrap();
        let b = root.find_child(None, "b").unwrap();
        assert_eq!(b.text(), "Fish & Chips <3 <raw>");
        let c = root.find_child(None, "c").unwrap();
        assert_eq!(c.attribute("v"), Some("1 < 2"));
    }

    #[test]
    fn test_whitespace_between_elements_dropped() {
        let root = Element::parse("<a>\n  <b> x </b>\n</a>").unwrap();
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.find_child(None, "b").unwrap().text(), " x ");
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            Element::parse("<a><b></a>"),
            Err(GpxError::Xml(_))
        ));
        assert!(Element::parse("<a><b>").is_err());
        assert!(matches!(Element::parse(""), Err(GpxError::EmptyDocument)));
        assert!(matches!(
            Element::parse("<p:a/>"),
            Err(GpxError::UnknownPrefix(_))
        ));
    }

    #[test]
    fn test_equality_ignores_prefix_spelling() {
        let a = Element::parse(r#"<x:a xmlns:x="urn:x"><x:b>1</x:b></x:a>"#).unwrap();
        let b = Element::parse(r#"<a xmlns="urn:x"><b>1</b></a>"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = Element::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = root.descendants().map(Element::name).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let root = Element::parse("<a><b>1</b></a>").unwrap();
        let mut copy = root.clone();
        copy.child_elements_mut().next().unwrap().set_text("2");
        assert_eq!(root.find_child(None, "b").unwrap().text(), "1");
    }
}
