//! KML 2.2 output and input.

use crate::error::{GpxError, Result};
use crate::models::{Gpx, Metadata, Route, Track, TrackSegment, Waypoint};
use crate::serializer::{self, WriteOptions};
use crate::types::{Decimal, Latitude, Longitude};
use crate::xml::Element;

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

fn kml(name: &str) -> Element {
    Element::new(Some(KML_NAMESPACE), name)
}

fn text_element(name: &str, text: &str) -> Element {
    let mut element = kml(name);
    element.set_text(text);
    element
}

fn coordinate(p: &Waypoint) -> String {
    match &p.ele {
        Some(ele) => format!("{},{},{ele}", p.lon, p.lat),
        None => format!("{},{}", p.lon, p.lat),
    }
}

fn coordinates(points: &[Waypoint]) -> Element {
    let text: Vec<String> = points.iter().map(coordinate).collect();
    text_element("coordinates", &text.join(" "))
}

fn line_string(points: &[Waypoint]) -> Element {
    let mut line = kml("LineString");
    line.push_element(coordinates(points));
    line
}

fn placemark(name: Option<&str>, desc: Option<&str>, geometry: Element) -> Element {
    let mut placemark = kml("Placemark");
    if let Some(name) = name {
        placemark.push_element(text_element("name", name));
    }
    if let Some(desc) = desc {
        placemark.push_element(text_element("description", desc));
    }
    placemark.push_element(geometry);
    placemark
}

/// Renders waypoints as Point placemarks and routes as LineStrings.
/// Single-segment tracks become a LineString, longer ones a MultiGeometry.
pub fn to_kml(gpx: &Gpx) -> Result<String> {
    let mut document = kml("Document");
    if let Some(name) = gpx.name() {
        document.push_element(text_element("name", name));
    }
    if let Some(desc) = gpx.desc() {
        document.push_element(text_element("description", desc));
    }

    for p in &gpx.waypoints {
        let mut point = kml("Point");
        point.push_element(text_element("coordinates", &coordinate(p)));
        document.push_element(placemark(p.name.as_deref(), p.desc.as_deref(), point));
    }
    for r in &gpx.routes {
        document.push_element(placemark(
            r.name.as_deref(),
            r.desc.as_deref(),
            line_string(&r.points),
        ));
    }
    for t in &gpx.tracks {
        let geometry = match t.segments.as_slice() {
            [] => continue,
            [segment] => line_string(&segment.points),
            segments => {
                let mut multi = kml("MultiGeometry");
                for segment in segments {
                    multi.push_element(line_string(&segment.points));
                }
                multi
            }
        };
        document.push_element(placemark(t.name.as_deref(), t.desc.as_deref(), geometry));
    }

    let mut root = kml("kml");
    root.declare(None, KML_NAMESPACE);
    root.push_element(document);
    serializer::to_string(&root, &WriteOptions::default())
}

/// KML files are read with or without the KML namespace.
fn child<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.child_elements().find(|e| e.name() == name)
}

fn child_text(parent: &Element, name: &str) -> Option<String> {
    let text = child(parent, name)?.text();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_coordinates(text: &str) -> Result<Vec<Waypoint>> {
    let mut points = Vec::new();
    for tuple in text.split_whitespace() {
        let parts: Vec<&str> = tuple.split(',').collect();
        if parts.len() < 2 {
            log::warn!("skipping KML coordinate '{tuple}'");
            continue;
        }
        let invalid = || GpxError::Invalid(format!("invalid KML coordinate '{tuple}'"));
        let lon: Longitude = parts[0].parse().map_err(|_| invalid())?;
        let lat: Latitude = parts[1].parse().map_err(|_| invalid())?;
        let mut point = Waypoint::new(lat, lon);
        if let Some(alt) = parts.get(2) {
            point.ele = Some(alt.parse::<Decimal>().map_err(|_| invalid())?);
        }
        points.push(point);
    }
    Ok(points)
}

fn geometry_points(geometry: &Element) -> Result<Vec<Waypoint>> {
    match child(geometry, "coordinates") {
        Some(coords) => parse_coordinates(&coords.text()),
        None => Ok(Vec::new()),
    }
}

/// Reads Point, LineString and MultiGeometry placemarks back into
/// waypoints, routes and tracks.
pub fn from_kml(xml: &str, creator: &str) -> Result<Gpx> {
    let root = Element::parse(xml)?;
    let mut gpx = Gpx::new(creator);

    if let Some(document) = root.descendants().find(|e| e.name() == "Document") {
        let name = child_text(document, "name");
        let desc = child_text(document, "description");
        if name.is_some() || desc.is_some() {
            gpx.metadata = Some(Metadata {
                name,
                desc,
                ..Default::default()
            });
        }
    }

    for placemark in root.descendants().filter(|e| e.name() == "Placemark") {
        let name = child_text(placemark, "name");
        let desc = child_text(placemark, "description");

        if let Some(point) = child(placemark, "Point") {
            if let Some(mut waypoint) = geometry_points(point)?.into_iter().next() {
                waypoint.name = name;
                waypoint.desc = desc;
                gpx.waypoints.push(waypoint);
            }
        } else if let Some(line) = child(placemark, "LineString") {
            let points = geometry_points(line)?;
            if !points.is_empty() {
                gpx.routes.push(Route {
                    name,
                    desc,
                    points,
                    ..Default::default()
                });
            }
        } else if let Some(multi) = child(placemark, "MultiGeometry") {
            let mut segments = Vec::new();
            for line in multi.descendants().filter(|e| e.name() == "LineString") {
                let points = geometry_points(line)?;
                if !points.is_empty() {
                    segments.push(TrackSegment {
                        points,
                        extensions: None,
                    });
                }
            }
            if !segments.is_empty() {
                gpx.tracks.push(Track {
                    name,
                    desc,
                    segments,
                    ..Default::default()
                });
            }
        } else {
            log::warn!("skipping placemark without Point, LineString or MultiGeometry");
        }
    }

    log::debug!(
        "read KML: {} waypoints, {} routes, {} tracks",
        gpx.waypoints.len(),
        gpx.routes.len(),
        gpx.tracks.len()
    );
    Ok(gpx)
}
