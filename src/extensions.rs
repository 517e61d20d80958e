use std::collections::BTreeSet;

use crate::error::Result;
use crate::marshal::XmlItem;
use crate::namespace::{GPX_NAMESPACE, NamespaceMap};
use crate::xml::Element;

/// Foreign XML carried inside an `<extensions>` element.
///
/// Fragments are stored as owned trees and never interpreted. Everything
/// that goes in or comes out is a clone, so callers never share a subtree
/// with the container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions {
    elements: Vec<Element>,
}

fn matches(element: &Element, tag: &str, namespace: Option<&str>) -> bool {
    element.name() == tag && namespace.is_none_or(|ns| element.namespace() == Some(ns))
}

impl Extensions {
    pub const TAG: &'static str = "extensions";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
        }
    }

    /// Captures every direct child element of an `<extensions>` element.
    pub fn from_xml(element: &Element) -> Self {
        Self {
            elements: element.child_elements().cloned().collect(),
        }
    }

    /// Builds an `<extensions>` element holding copies of every fragment.
    pub fn to_xml(&self, tag: Option<&str>, namespaces: Option<&NamespaceMap>) -> Element {
        let namespace = namespaces
            .and_then(NamespaceMap::default_namespace)
            .unwrap_or(GPX_NAMESPACE);
        let mut element = Element::new(Some(namespace), tag.unwrap_or(Self::TAG));
        if let Some(namespaces) = namespaces {
            for (prefix, uri) in namespaces.iter() {
                element.declare(prefix, uri);
            }
        }
        for fragment in &self.elements {
            element.push_element(fragment.clone());
        }
        element
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Whether any fragment, or any element inside one, has this name.
    pub fn contains(&self, tag: &str, namespace: Option<&str>) -> bool {
        self.find_element(tag, namespace).is_some()
    }

    fn find_element(&self, tag: &str, namespace: Option<&str>) -> Option<&Element> {
        self.elements
            .iter()
            .flat_map(Element::descendants)
            .find(|e| matches(e, tag, namespace))
    }

    /// Looks up a `prefix:name/prefix:name` path.
    ///
    /// The first step may name a top-level fragment itself; otherwise the
    /// path is resolved against the children of each fragment.
    pub fn find(&self, path: &str, namespaces: &NamespaceMap) -> Option<&Element> {
        self.find_all(path, namespaces).into_iter().next()
    }

    pub fn find_all(&self, path: &str, namespaces: &NamespaceMap) -> Vec<&Element> {
        let Some(steps) = parse_path(path, namespaces) else {
            log::debug!("path {path:?} uses an unknown prefix");
            return Vec::new();
        };
        let Some((first, rest)) = steps.split_first() else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for fragment in &self.elements {
            if step_matches(fragment, first) {
                walk_path(fragment, rest, &mut found);
            } else {
                walk_path(fragment, &steps, &mut found);
            }
        }
        found
    }

    /// Text of the first element named `tag`, searched through every
    /// fragment and its descendants. Empty text counts as absent.
    pub fn get_text(&self, tag: &str, namespace: Option<&str>) -> Option<String> {
        let text = self.find_element(tag, namespace)?.text();
        if text.is_empty() { None } else { Some(text) }
    }

    pub fn get_int(&self, tag: &str, namespace: Option<&str>) -> Option<i64> {
        self.get_text(tag, namespace)?.trim().parse().ok()
    }

    pub fn get_float(&self, tag: &str, namespace: Option<&str>) -> Option<f64> {
        self.get_text(tag, namespace)?.trim().parse().ok()
    }

    /// Sets the text of the first element named `tag` in `namespace`.
    ///
    /// A missing element is created under the first element named
    /// `parent_tag` (itself created at the top level when absent), or at
    /// the top level when no parent is given. New elements reuse the
    /// prefix already used for `namespace` in this container.
    pub fn set_text(&mut self, tag: &str, value: &str, namespace: &str, parent_tag: Option<&str>) {
        let is_target = |e: &Element| matches(e, tag, Some(namespace));
        for fragment in &mut self.elements {
            if let Some(existing) = fragment.find_descendant_mut(&is_target) {
                existing.set_text(value);
                return;
            }
        }

        let prefix = self.prefix_for(namespace);
        let mut child = Element::new(Some(namespace), tag).with_prefix(prefix.as_deref());
        child.set_text(value);

        let Some(parent_tag) = parent_tag else {
            self.elements.push(child);
            return;
        };
        let is_parent = |e: &Element| matches(e, parent_tag, Some(namespace));
        for fragment in &mut self.elements {
            if let Some(parent) = fragment.find_descendant_mut(&is_parent) {
                parent.push_element(child);
                return;
            }
        }
        let mut parent = Element::new(Some(namespace), parent_tag).with_prefix(prefix.as_deref());
        parent.push_element(child);
        self.elements.push(parent);
    }

    fn prefix_for(&self, namespace: &str) -> Option<String> {
        self.elements
            .iter()
            .flat_map(Element::descendants)
            .find(|e| e.namespace() == Some(namespace))
            .and_then(|e| e.prefix().map(str::to_string))
    }

    /// Removes the first element named `tag`: top-level fragments are
    /// checked before the direct children of each fragment.
    pub fn remove(&mut self, tag: &str, namespace: Option<&str>) -> bool {
        if let Some(idx) = self
            .elements
            .iter()
            .position(|e| matches(e, tag, namespace))
        {
            self.elements.remove(idx);
            return true;
        }
        for fragment in &mut self.elements {
            let position = fragment
                .child_elements()
                .position(|e| matches(e, tag, namespace));
            if let Some(idx) = position {
                fragment.remove_child_element(idx);
                return true;
            }
        }
        false
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Appends copies of `elements`.
    pub fn extend<'a>(&mut self, elements: impl IntoIterator<Item = &'a Element>) {
        self.elements.extend(elements.into_iter().cloned());
    }

    /// Every namespace URI used anywhere in the stored fragments.
    pub fn namespaces(&self) -> BTreeSet<String> {
        self.elements
            .iter()
            .flat_map(Element::descendants)
            .flat_map(|e| {
                e.namespace()
                    .into_iter()
                    .chain(e.attributes().iter().filter_map(|a| a.namespace.as_deref()))
            })
            .map(str::to_string)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Extensions {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl XmlItem for Extensions {
    const IS_MODEL: bool = true;

    /// An `<extensions>` element without child elements reads as absent.
    fn read_item(element: &Element, _owner: &'static str, _field: &'static str) -> Result<Option<Self>> {
        let extensions = Extensions::from_xml(element);
        Ok((!extensions.is_empty()).then_some(extensions))
    }

    fn write_item(&self, tag: &str, namespace: Option<&str>) -> Option<Element> {
        if self.is_empty() {
            return None;
        }
        let mut element = Element::new(namespace, tag);
        for fragment in &self.elements {
            element.push_element(fragment.clone());
        }
        Some(element)
    }
}

struct Step {
    namespace: Option<String>,
    name: String,
}

fn parse_path(path: &str, namespaces: &NamespaceMap) -> Option<Vec<Step>> {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(|segment| match segment.split_once(':') {
            Some((prefix, name)) => Some(Step {
                namespace: Some(namespaces.get(Some(prefix))?.to_string()),
                name: name.to_string(),
            }),
            None => Some(Step {
                namespace: namespaces.default_namespace().map(str::to_string),
                name: segment.to_string(),
            }),
        })
        .collect()
}

fn step_matches(element: &Element, step: &Step) -> bool {
    (step.name == "*" || element.name() == step.name)
        && element.namespace() == step.namespace.as_deref()
}

fn walk_path<'a>(element: &'a Element, steps: &[Step], found: &mut Vec<&'a Element>) {
    let Some((step, rest)) = steps.split_first() else {
        found.push(element);
        return;
    };
    for child in element.child_elements() {
        if step_matches(child, step) {
            walk_path(child, rest, found);
        }
    }
}
