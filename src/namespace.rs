use std::sync::LazyLock;

use regex::Regex;

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const GPX_SCHEMA_LOCATION: &str =
    "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd";

/// Comments, CDATA sections and processing instructions.
static SKIPPED_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<\?.*?\?>"#)
        .expect("skipped section pattern is valid")
});

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[A-Za-z_](?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("start tag pattern is valid")
});

static XMLNS_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\sxmlns(?::([A-Za-z_][\w.\-]*))?\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("namespace declaration pattern is valid")
});

/// Ordered prefix→URI bindings. `None` is the default namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    bindings: Vec<(Option<String>, String)>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix`, replacing any earlier binding of the same prefix.
    pub fn insert(&mut self, prefix: Option<&str>, uri: &str) {
        match self.bindings.iter_mut().find(|(p, _)| p.as_deref() == prefix) {
            Some(binding) => binding.1 = uri.to_string(),
            None => self
                .bindings
                .push((prefix.map(str::to_string), uri.to_string())),
        }
    }

    /// Binds `prefix` only if it is not bound yet.
    pub fn insert_missing(&mut self, prefix: Option<&str>, uri: &str) {
        if !self.contains_prefix(prefix) {
            self.bindings
                .push((prefix.map(str::to_string), uri.to_string()));
        }
    }

    pub fn get(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    pub fn contains_prefix(&self, prefix: Option<&str>) -> bool {
        self.get(prefix).is_some()
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.get(None).filter(|uri| !uri.is_empty())
    }

    /// First prefix bound to `uri`, with `None` standing for the default.
    pub fn prefix_for(&self, uri: &str) -> Option<Option<&str>> {
        self.bindings
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_deref())
    }

    pub fn merge(&mut self, other: &NamespaceMap) {
        for (prefix, uri) in other.iter() {
            self.insert_missing(prefix, uri);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.bindings
            .iter()
            .map(|(p, uri)| (p.as_deref(), uri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<'a> FromIterator<(Option<&'a str>, &'a str)> for NamespaceMap {
    fn from_iter<I: IntoIterator<Item = (Option<&'a str>, &'a str)>>(iter: I) -> Self {
        let mut map = NamespaceMap::new();
        for (prefix, uri) in iter {
            map.insert_missing(prefix, uri);
        }
        map
    }
}

/// Collects every `xmlns` declaration in raw XML text, in source order.
///
/// Tree parsers keep the resolved URI of each name but lose which prefix
/// spelled it. Scanning the text keeps the spelling, including
/// declarations that only appear deep inside extension content. Only start
/// tags are scanned; comments, CDATA and text never contribute bindings.
pub fn scan_declarations(xml: &str) -> NamespaceMap {
    let mut map = NamespaceMap::new();
    let markup = SKIPPED_SECTION.replace_all(xml, "");
    let declarations = START_TAG
        .find_iter(&markup)
        .flat_map(|tag| XMLNS_ATTRIBUTE.captures_iter(tag.as_str()));
    for caps in declarations {
        let prefix = caps.get(1).map(|m| m.as_str());
        let uri = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        if prefix.is_some() && uri.is_empty() {
            log::warn!("ignoring empty binding for prefix {prefix:?}");
            continue;
        }
        map.insert_missing(prefix, uri);
    }
    log::debug!("scanned {} namespace declarations", map.len());
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_declarations() {
        let xml = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1"
            xmlns:xsi='http://www.w3.org/2001/XMLSchema-instance'>
            <extensions><x:a xmlns:x="urn:x"/></extensions></gpx>"#;
        let map = scan_declarations(xml);
        assert_eq!(map.len(), 3);
        assert_eq!(map.default_namespace(), Some(GPX_NAMESPACE));
        assert_eq!(map.get(Some("xsi")), Some(XSI_NAMESPACE));
        assert_eq!(map.get(Some("x")), Some("urn:x"));
        assert_eq!(map.prefix_for("urn:x"), Some(Some("x")));
    }

    #[test]
    fn test_first_binding_wins() {
        let xml = r#"<a xmlns:p="urn:one"><b xmlns:p="urn:two"/></a>"#;
        let map = scan_declarations(xml);
        assert_eq!(map.get(Some("p")), Some("urn:one"));
    }

    #[test]
    fn test_ignores_declarations_outside_tags() {
        let xml = r#"<gpx xmlns="urn:gpx">
  <!-- <a xmlns:c="urn:comment"/> -->
  <desc>use xmlns:t="urn:text" to bind t</desc>
  <cmt><![CDATA[<b xmlns:d="urn:cdata"/>]]></cmt>
  <e title="a > b" xmlns:e="urn:real"/>
</gpx>"#;
        let map = scan_declarations(xml);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(Some("e")), Some("urn:real"));
        assert_eq!(map.get(Some("c")), None);
        assert_eq!(map.get(Some("t")), None);
        assert_eq!(map.get(Some("d")), None);
    }

    #[test]
    fn test_insert_replaces() {
        let mut map = NamespaceMap::new();
        map.insert(Some("p"), "urn:one");
        map.insert(Some("p"), "urn:two");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(Some("p")), Some("urn:two"));
    }
}
