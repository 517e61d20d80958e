use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, GpxError>;

/// Failures raised while constructing a bounded scalar from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("Invalid latitude value: '{0}'. Must be between [-90.0, 90.0].")]
    InvalidLatitude(String),
    #[error("Invalid longitude value: '{0}'. Must be between [-180.0, 180.0].")]
    InvalidLongitude(String),
    #[error("Invalid degrees value: '{0}'. Must be between [0.0, 360.0).")]
    InvalidDegrees(String),
    #[error("Invalid fix value: '{0}'. Must be one of none, 2d, 3d, dgps, pps.")]
    InvalidFix(String),
    #[error("Invalid DGPS station value: '{0}'. Must be between [0, 1023].")]
    InvalidDgpsStation(String),
    #[error("Invalid decimal value: '{0}'.")]
    InvalidDecimal(String),
    #[error("Invalid integer value: '{0}'.")]
    InvalidInteger(String),
    #[error("Invalid datetime value: '{0}'. Must be ISO 8601 with a timezone offset.")]
    InvalidDateTime(String),
}

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML document ended inside <{0}>")]
    UnexpectedEof(String),
    #[error("XML document has no root element")]
    EmptyDocument,
    #[error("undeclared namespace prefix '{0}'")]
    UnknownPrefix(String),
    #[error("{element} element missing required '{attribute}' attribute")]
    MissingRequiredAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("{element} element missing required '{child}' element")]
    MissingRequiredElement {
        element: &'static str,
        child: &'static str,
    },
    #[error("invalid '{field}' on {element}: {source}")]
    InvalidValue {
        element: &'static str,
        field: &'static str,
        #[source]
        source: ValueError,
    },
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("invalid GPX document: {0}")]
    Invalid(String),
    #[error("no {0} data to aggregate")]
    NoData(&'static str),
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),
    #[error("Invalid WKT: {0}")]
    InvalidWkt(String),
    #[error("Invalid WKB: {0}")]
    InvalidWkb(String),
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<geojson::Error> for GpxError {
    fn from(e: geojson::Error) -> Self {
        Self::GeoJson(Box::new(e))
    }
}

impl From<quick_xml::events::attributes::AttrError> for GpxError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(e.into())
    }
}

impl From<quick_xml::escape::EscapeError> for GpxError {
    fn from(e: quick_xml::escape::EscapeError) -> Self {
        Self::Xml(e.into())
    }
}

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_value_and_bound() {
        let e = ValueError::InvalidLatitude("91".into());
        assert_eq!(
            e.to_string(),
            "Invalid latitude value: '91'. Must be between [-90.0, 90.0]."
        );
        let e = ValueError::InvalidFix("3D".into());
        assert!(e.to_string().contains("none, 2d, 3d, dgps, pps"));
    }

    #[test]
    fn test_missing_attribute_message() {
        let e = GpxError::MissingRequiredAttribute {
            element: "Waypoint",
            attribute: "lat",
        };
        assert_eq!(e.to_string(), "Waypoint element missing required 'lat' attribute");
    }
}
