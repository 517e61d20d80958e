use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

use crate::error::{GpxError, Result};
use crate::extensions::Extensions;
use crate::marshal::{Model, gpx_model};
use crate::models::{Bounds, Metadata, Route, Track, Waypoint};
use crate::namespace::{
    GPX_SCHEMA_LOCATION, NamespaceMap, XSI_NAMESPACE, scan_declarations,
};
use crate::serializer::{self, WriteOptions};
use crate::xml::Element;

pub const GPX_VERSION: &str = "1.1";
pub const DEFAULT_CREATOR: &str = "gpxkit";

gpx_model! {
    /// The root of a GPX document.
    ///
    /// `version` is not a field: every built document is written as GPX 1.1.
    pub struct Gpx as "gpx" {
        /// Name or URL of the software that created the document.
        pub creator: String = "creator",
        pub metadata: Option<Metadata> = "metadata",
        pub waypoints: Vec<Waypoint> = "wpt",
        pub routes: Vec<Route> = "rte",
        pub tracks: Vec<Track> = "trk",
        pub extensions: Option<Extensions> = "extensions",
    }
    extra {
        /// Prefix bindings seen in the source document, re-declared on output.
        pub namespaces: NamespaceMap = |element: &Element| element.declarations().clone(),
    }
    finish(gpx, element) {
        element.set_attribute("version", GPX_VERSION);
        element.hoist_attribute("version");
        element.set_attribute_ns(
            Some(XSI_NAMESPACE),
            Some("xsi"),
            "schemaLocation",
            GPX_SCHEMA_LOCATION,
        );

        let mut declarations = NamespaceMap::new();
        if let Some(namespace) = element.namespace() {
            declarations.insert(None, namespace);
        }
        declarations.insert(Some("xsi"), XSI_NAMESPACE);
        declarations.merge(element.declarations());
        for (prefix, uri) in gpx.namespaces.iter() {
            if prefix.is_some() {
                declarations.insert_missing(prefix, uri);
            }
        }
        element.set_declarations(declarations);
    }
}

impl Default for Gpx {
    fn default() -> Self {
        Self::new(DEFAULT_CREATOR)
    }
}

impl Gpx {
    pub fn new(creator: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
            metadata: None,
            waypoints: Vec::new(),
            routes: Vec::new(),
            tracks: Vec::new(),
            extensions: None,
            namespaces: NamespaceMap::new(),
        }
    }

    /// Parses a GPX document, keeping every namespace prefix it declares.
    pub fn from_string(xml: &str) -> Result<Gpx> {
        let root = Element::parse(xml)?;
        let mut gpx = Gpx::from_xml(&root)?;
        gpx.namespaces.merge(&scan_declarations(xml));
        log::debug!(
            "parsed GPX: {} waypoints, {} routes, {} tracks",
            gpx.waypoints.len(),
            gpx.routes.len(),
            gpx.tracks.len()
        );
        Ok(gpx)
    }

    pub fn to_xml_string(&self) -> Result<String> {
        self.to_xml_string_with(&WriteOptions::default())
    }

    pub fn to_xml_string_with(&self, options: &WriteOptions) -> Result<String> {
        serializer::to_string(&self.to_xml(), options)
    }

    /// Checks the document against the GPX 1.1 structure before parsing it.
    pub fn from_string_validated(xml: &str) -> Result<Gpx> {
        let root = Element::parse(xml)?;
        crate::validate::validate(&root)?;
        let mut gpx = Gpx::from_xml(&root)?;
        gpx.namespaces.merge(&scan_declarations(xml));
        Ok(gpx)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref()?.name.as_deref()
    }

    pub fn desc(&self) -> Option<&str> {
        self.metadata.as_ref()?.desc.as_deref()
    }

    pub fn time(&self) -> Option<&DateTime<FixedOffset>> {
        self.metadata.as_ref()?.time.as_ref()
    }

    pub fn keywords(&self) -> Option<&str> {
        self.metadata.as_ref()?.keywords.as_deref()
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.metadata.as_ref()?.bounds.as_ref()
    }

    /// Metadata, created empty on first use.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata.get_or_insert_with(Metadata::default)
    }

    /// Every waypoint, route point and track point.
    pub fn points(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints
            .iter()
            .chain(self.routes.iter().flat_map(|r| r.points.iter()))
            .chain(self.tracks.iter().flat_map(Track::points))
    }

    pub fn points_mut(&mut self) -> impl Iterator<Item = &mut Waypoint> {
        self.waypoints
            .iter_mut()
            .chain(self.routes.iter_mut().flat_map(|r| r.points.iter_mut()))
            .chain(
                self.tracks
                    .iter_mut()
                    .flat_map(|t| t.segments.iter_mut())
                    .flat_map(|s| s.points.iter_mut()),
            )
    }
}

impl FromStr for Gpx {
    type Err = GpxError;

    fn from_str(s: &str) -> Result<Self> {
        Gpx::from_string(s)
    }
}
