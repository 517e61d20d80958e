use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;
use crate::namespace::{NamespaceMap, XML_NAMESPACE};
use crate::xml::{Element, Node};

/// Output settings for XML text.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Spaces per nesting level; `None` writes everything on one line.
    pub indent: Option<usize>,
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` first.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            declaration: true,
        }
    }
}

/// Serializes `root` and its subtree.
pub fn to_string(root: &Element, options: &WriteOptions) -> Result<String> {
    to_string_registered(root, &NamespaceMap::new(), options)
}

/// Serializes `root`, declaring every binding in `registered` on the root
/// element so that descendants in those namespaces reuse the same prefixes.
pub fn to_string_registered(
    root: &Element,
    registered: &NamespaceMap,
    options: &WriteOptions,
) -> Result<String> {
    let writer = match options.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };
    let mut serializer = Serializer {
        writer,
        scopes: Vec::new(),
    };
    if options.declaration {
        serializer
            .writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    }
    serializer.write_element(root, Some(registered))?;
    let bytes = serializer.writer.into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

struct Serializer {
    writer: Writer<Vec<u8>>,
    /// In-scope bindings, one entry per open element.
    scopes: Vec<NamespaceMap>,
}

impl Serializer {
    fn write_element(&mut self, element: &Element, registered: Option<&NamespaceMap>) -> Result<()> {
        let mut declared = NamespaceMap::new();
        if let Some(registered) = registered {
            declared.merge(registered);
        }
        for (prefix, uri) in element.declarations().iter() {
            declared.insert(prefix, uri);
        }
        let mut scope = self.scopes.last().cloned().unwrap_or_default();
        for (prefix, uri) in declared.iter() {
            scope.insert(prefix, uri);
        }

        let prefix = element_prefix(element, &mut declared, &mut scope);
        let qname = qualify(prefix.as_deref(), element.name());

        let mut attributes = Vec::with_capacity(element.attributes().len());
        for attr in element.attributes() {
            let name = match attr.namespace.as_deref() {
                None => attr.name.clone(),
                Some(XML_NAMESPACE) => format!("xml:{}", attr.name),
                Some(uri) => {
                    let prefix =
                        attribute_prefix(uri, attr.prefix.as_deref(), &mut declared, &mut scope);
                    format!("{prefix}:{}", attr.name)
                }
            };
            attributes.push((name, attr.value.as_str()));
        }

        let mut start = BytesStart::new(qname.as_str());
        for (prefix, uri) in declared.iter() {
            let key = match prefix {
                None => "xmlns".to_string(),
                Some(p) => format!("xmlns:{p}"),
            };
            start.push_attribute((key.as_str(), uri));
        }
        for (name, value) in &attributes {
            start.push_attribute((name.as_str(), *value));
        }

        if element.children().is_empty() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        self.writer.write_event(Event::Start(start))?;
        self.scopes.push(scope);
        for child in element.children() {
            match child {
                Node::Element(e) => self.write_element(e, None)?,
                Node::Text(t) => self.writer.write_event(Event::Text(BytesText::new(t)))?,
                Node::Comment(c) => self
                    .writer
                    .write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?,
            }
        }
        self.scopes.pop();
        self.writer
            .write_event(Event::End(BytesEnd::new(qname.as_str())))?;
        Ok(())
    }
}

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{name}"),
        None => name.to_string(),
    }
}

/// Picks the prefix an element is written with, declaring one if needed.
fn element_prefix(
    element: &Element,
    declared: &mut NamespaceMap,
    scope: &mut NamespaceMap,
) -> Option<String> {
    let Some(uri) = element.namespace() else {
        if scope.default_namespace().is_some() {
            declared.insert(None, "");
            scope.insert(None, "");
        }
        return None;
    };

    let original = element.prefix();
    if scope.get(original) == Some(uri) {
        return original.map(str::to_string);
    }
    if let Some(prefix) = scope.prefix_for(uri) {
        return prefix.map(str::to_string);
    }

    let prefix = match original {
        Some(p) if !declared.contains_prefix(Some(p)) => Some(p.to_string()),
        None if !declared.contains_prefix(None) => None,
        _ => Some(generate_prefix(scope)),
    };
    declared.insert(prefix.as_deref(), uri);
    scope.insert(prefix.as_deref(), uri);
    prefix
}

/// Attributes never use the default namespace, so this always yields a name.
fn attribute_prefix(
    uri: &str,
    original: Option<&str>,
    declared: &mut NamespaceMap,
    scope: &mut NamespaceMap,
) -> String {
    if let Some(p) = original {
        if scope.get(Some(p)) == Some(uri) {
            return p.to_string();
        }
    }
    if let Some(p) = scope
        .iter()
        .find_map(|(p, u)| if u == uri { p } else { None })
    {
        return p.to_string();
    }

    let prefix = match original {
        Some(p) if !declared.contains_prefix(Some(p)) => p.to_string(),
        _ => generate_prefix(scope),
    };
    declared.insert(Some(&prefix), uri);
    scope.insert(Some(&prefix), uri);
    prefix
}

fn generate_prefix(scope: &NamespaceMap) -> String {
    let mut n = 0;
    loop {
        let candidate = format!("ns{n}");
        if !scope.contains_prefix(Some(&candidate)) {
            log::debug!("no recorded prefix available, generated {candidate}");
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact() -> WriteOptions {
        WriteOptions {
            indent: None,
            declaration: false,
        }
    }

    #[test]
    fn test_reuses_original_prefixes() {
        let xml = r#"<gpx xmlns="urn:gpx" xmlns:gpxtpx="urn:tpx"><gpxtpx:hr>142</gpxtpx:hr></gpx>"#;
        let root = Element::parse(xml).unwrap();
        let out = to_string(&root, &compact()).unwrap();
        assert_eq!(out, xml);
    }

    #[test]
    fn test_registered_bindings_declared_on_root() {
        let mut root = Element::new(Some("urn:gpx"), "gpx");
        root.push_element(Element::new(Some("urn:tpx"), "hr").with_prefix(Some("gpxtpx")));
        let mut registered = NamespaceMap::new();
        registered.insert(None, "urn:gpx");
        registered.insert(Some("gpxtpx"), "urn:tpx");
        let out = to_string_registered(&root, &registered, &compact()).unwrap();
        assert_eq!(
            out,
            r#"<gpx xmlns="urn:gpx" xmlns:gpxtpx="urn:tpx"><gpxtpx:hr/></gpx>"#
        );
    }

    #[test]
    fn test_declares_missing_prefix_locally() {
        let mut root = Element::new(Some("urn:gpx"), "gpx");
        root.push_element(Element::new(Some("urn:tpx"), "hr").with_prefix(Some("gpxtpx")));
        let out = to_string(&root, &compact()).unwrap();
        assert_eq!(
            out,
            r#"<gpx xmlns="urn:gpx"><gpxtpx:hr xmlns:gpxtpx="urn:tpx"/></gpx>"#
        );
    }

    #[test]
    fn test_generates_prefix_only_when_needed() {
        let mut root = Element::new(Some("urn:gpx"), "gpx");
        let mut child = Element::new(Some("urn:other"), "a");
        child.set_attribute_ns(Some("urn:attr"), None, "k", "v");
        root.push_element(child);
        let out = to_string(&root, &compact()).unwrap();
        assert_eq!(
            out,
            r#"<gpx xmlns="urn:gpx"><a xmlns="urn:other" xmlns:ns0="urn:attr" ns0:k="v"/></gpx>"#
        );
    }

    #[test]
    fn test_unqualified_child_under_default_namespace() {
        let mut root = Element::new(Some("urn:gpx"), "gpx");
        root.push_element(Element::new(None, "plain"));
        let out = to_string(&root, &compact()).unwrap();
        assert_eq!(out, r#"<gpx xmlns="urn:gpx"><plain xmlns=""/></gpx>"#);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut root = Element::new(None, "a");
        root.set_text("Fish & Chips <3");
        let out = to_string(&root, &compact()).unwrap();
        assert_eq!(out, "<a>Fish &amp; Chips &lt;3</a>");
        assert_eq!(Element::parse(&out).unwrap(), root);
    }
}
