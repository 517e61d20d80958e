//! Structural checks against the GPX 1.1 schema.
//!
//! The schema is described by the models' own field tables: a GPX element
//! may only contain the children its model declares, in declaration order,
//! and must carry every required attribute. No schema file is fetched.

use crate::error::{GpxError, Result};
use crate::marshal::{FieldDescriptor, FieldShape, Model};
use crate::models::{
    Bounds, Copyright, Email, GPX_VERSION, Gpx, Link, Metadata, Person, Route, Track, TrackSegment,
    Waypoint,
};
use crate::namespace::GPX_NAMESPACE;
use crate::xml::Element;

/// Field table for a GPX element name.
fn fields_for(name: &str) -> Option<&'static [FieldDescriptor]> {
    Some(match name {
        "gpx" => Gpx::FIELDS,
        "metadata" => Metadata::FIELDS,
        "wpt" | "rtept" | "trkpt" => Waypoint::FIELDS,
        "rte" => Route::FIELDS,
        "trk" => Track::FIELDS,
        "trkseg" => TrackSegment::FIELDS,
        "author" => Person::FIELDS,
        "email" => Email::FIELDS,
        "link" => Link::FIELDS,
        "copyright" => Copyright::FIELDS,
        "bounds" => Bounds::FIELDS,
        _ => return None,
    })
}

fn invalid(path: &str, message: impl std::fmt::Display) -> GpxError {
    GpxError::Invalid(format!("{path}: {message}"))
}

/// Checks a parsed document, reporting the first problem with the path of
/// the offending element (`/gpx/trk[1]/trkseg[2]/trkpt[3]`).
pub fn validate(root: &Element) -> Result<()> {
    let path = format!("/{}", root.name());
    if !root.is(Some(GPX_NAMESPACE), "gpx") {
        return Err(invalid(
            &path,
            format!("root must be 'gpx' in namespace {GPX_NAMESPACE}"),
        ));
    }
    match root.attribute("version") {
        Some(GPX_VERSION) => {}
        Some(other) => return Err(invalid(&path, format!("unsupported version '{other}'"))),
        None => return Err(invalid(&path, "missing required 'version' attribute")),
    }

    check_element(root, Gpx::FIELDS, &path)?;
    Gpx::from_xml(root).map_err(|err| invalid(&path, err))?;
    log::debug!("document is valid GPX {GPX_VERSION}");
    Ok(())
}

/// Parses and validates `xml`.
pub fn validate_str(xml: &str) -> Result<()> {
    validate(&Element::parse(xml)?)
}

impl Gpx {
    pub fn validate_str(xml: &str) -> Result<()> {
        validate_str(xml)
    }
}

fn check_element(element: &Element, fields: &[FieldDescriptor], path: &str) -> Result<()> {
    for field in fields {
        if field.shape == FieldShape::RequiredAttribute && element.attribute(field.name).is_none() {
            return Err(invalid(
                path,
                format!("missing required '{}' attribute", field.name),
            ));
        }
    }

    let mut position = 0;
    let mut last: Option<&str> = None;
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for child in element.child_elements() {
        let name = child.name();
        let index = match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                counts.push((name, 1));
                1
            }
        };
        let child_path = format!("{path}/{name}[{index}]");

        if child.namespace() != Some(GPX_NAMESPACE) {
            return Err(invalid(
                &child_path,
                "elements outside the GPX namespace belong in <extensions>",
            ));
        }
        let Some(slot) = fields
            .iter()
            .position(|f| f.name == name && f.shape != FieldShape::RequiredAttribute)
        else {
            return Err(invalid(&child_path, "unexpected element"));
        };
        if slot < position {
            return Err(invalid(&child_path, "element out of order"));
        }
        if last == Some(name) && fields[slot].shape != FieldShape::RepeatedElement {
            return Err(invalid(&child_path, "element may appear only once"));
        }
        position = slot;
        last = Some(name);

        if name == "extensions" {
            continue;
        }
        if let Some(child_fields) = fields_for(name) {
            check_element(child, child_fields, &child_path)?;
        }
    }
    Ok(())
}
