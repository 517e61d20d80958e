use chrono::{DateTime, FixedOffset};

use crate::extensions::Extensions;
use crate::marshal::gpx_model;
use crate::models::Link;
use crate::types::{Decimal, Degrees, DgpsStation, Fix, Latitude, Longitude};

gpx_model! {
    /// A point of interest, route point, or track point.
    pub struct Waypoint as "wpt" {
        pub lat: Latitude = "lat",
        pub lon: Longitude = "lon",
        /// Elevation in meters.
        pub ele: Option<Decimal> = "ele",
        /// Creation or recording time, UTC recommended.
        pub time: Option<DateTime<FixedOffset>> = "time",
        /// Magnetic variation in degrees.
        pub magvar: Option<Degrees> = "magvar",
        /// Height of the geoid above the WGS84 ellipsoid, in meters.
        pub geoidheight: Option<Decimal> = "geoidheight",
        pub name: Option<String> = "name",
        pub cmt: Option<String> = "cmt",
        pub desc: Option<String> = "desc",
        pub src: Option<String> = "src",
        pub links: Vec<Link> = "link",
        pub sym: Option<String> = "sym",
        pub kind: Option<String> = "type",
        pub fix: Option<Fix> = "fix",
        /// Number of satellites used for the fix.
        pub sat: Option<u32> = "sat",
        pub hdop: Option<Decimal> = "hdop",
        pub vdop: Option<Decimal> = "vdop",
        pub pdop: Option<Decimal> = "pdop",
        /// Seconds since the last DGPS update.
        pub ageofdgpsdata: Option<Decimal> = "ageofdgpsdata",
        pub dgpsid: Option<DgpsStation> = "dgpsid",
        pub extensions: Option<Extensions> = "extensions",
    }
}

impl Waypoint {
    pub fn new(lat: Latitude, lon: Longitude) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
            magvar: None,
            geoidheight: None,
            name: None,
            cmt: None,
            desc: None,
            src: None,
            links: Vec::new(),
            sym: None,
            kind: None,
            fix: None,
            sat: None,
            hdop: None,
            vdop: None,
            pdop: None,
            ageofdgpsdata: None,
            dgpsid: None,
            extensions: None,
        }
    }

    /// Builds a point from plain coordinates, validating their ranges.
    pub fn from_coords(lat: f64, lon: f64, ele: Option<f64>) -> crate::error::Result<Self> {
        let mut point = Self::new(Latitude::try_from(lat)?, Longitude::try_from(lon)?);
        point.ele = ele.map(Decimal::try_from).transpose()?;
        Ok(point)
    }

    pub fn elevation(&self) -> Option<f64> {
        self.ele.as_ref().map(Decimal::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GpxError, ValueError};
    use crate::marshal::{FieldShape, Model};
    use crate::xml::Element;

    const NS: &str = r#"xmlns="http://www.topografix.com/GPX/1/1""#;

    fn parse(xml: &str) -> crate::error::Result<Waypoint> {
        Waypoint::from_xml(&Element::parse(xml).unwrap())
    }

    #[test]
    fn test_field_table() {
        assert_eq!(Waypoint::FIELDS.len(), 21);
        assert_eq!(Waypoint::FIELDS[0].name, "lat");
        assert_eq!(Waypoint::FIELDS[0].shape, FieldShape::RequiredAttribute);
        assert_eq!(Waypoint::FIELDS[2].shape, FieldShape::OptionalElement);
        assert_eq!(Waypoint::FIELDS[10].name, "link");
        assert_eq!(Waypoint::FIELDS[10].shape, FieldShape::RepeatedElement);
        assert_eq!(Waypoint::FIELDS[20].shape, FieldShape::NestedModel);
    }

    #[test]
    fn test_parse_all_fields() {
        let xml = format!(
            r#"<wpt {NS} lat="52.5200" lon="13.4050">
  <ele>34.5</ele>
  <time>2024-01-15T10:00:00Z</time>
  <magvar>12.5</magvar>
  <geoidheight>45.2</geoidheight>
  <name>Berlin</name>
  <cmt>comment</cmt>
  <desc>description</desc>
  <src>GPS</src>
  <link href="https://example.com"/>
  <sym>Flag</sym>
  <type>city</type>
  <fix>3d</fix>
  <sat>8</sat>
  <hdop>1.2</hdop>
  <vdop>1.5</vdop>
  <pdop>1.9</pdop>
  <ageofdgpsdata>2.5</ageofdgpsdata>
  <dgpsid>512</dgpsid>
</wpt>"#
        );
        let wpt = parse(&xml).unwrap();
        assert_eq!(wpt.lat.to_string(), "52.5200");
        assert_eq!(wpt.elevation(), Some(34.5));
        assert_eq!(wpt.magvar.as_ref().unwrap().value(), 12.5);
        assert_eq!(wpt.name.as_deref(), Some("Berlin"));
        assert_eq!(wpt.kind.as_deref(), Some("city"));
        assert_eq!(wpt.fix, Some(Fix::ThreeD));
        assert_eq!(wpt.sat, Some(8));
        assert_eq!(wpt.dgpsid.unwrap().value(), 512);
        assert_eq!(wpt.links.len(), 1);

        let rebuilt = Waypoint::from_xml(&wpt.to_xml()).unwrap();
        assert_eq!(rebuilt, wpt);
    }

    #[test]
    fn test_missing_lat_or_lon() {
        let err = parse(r#"<wpt lon="13.4"/>"#).unwrap_err();
        assert!(matches!(
            err,
            GpxError::MissingRequiredAttribute {
                element: "Waypoint",
                attribute: "lat"
            }
        ));
        let err = parse(r#"<wpt lat="52.5"/>"#).unwrap_err();
        assert_eq!(err.to_string(), "Waypoint element missing required 'lon' attribute");
    }

    #[test]
    fn test_invalid_values() {
        let err = parse(r#"<wpt lat="91" lon="0"/>"#).unwrap_err();
        assert!(matches!(
            err,
            GpxError::InvalidValue {
                field: "lat",
                source: ValueError::InvalidLatitude(ref v),
                ..
            } if v == "91"
        ));
        let err = parse(&format!(r#"<wpt {NS} lat="0" lon="0"><fix>3D</fix></wpt>"#)).unwrap_err();
        assert!(err.to_string().contains("'3D'"));
        let err = parse(&format!(r#"<wpt {NS} lat="0" lon="0"><dgpsid>1024</dgpsid></wpt>"#))
            .unwrap_err();
        assert!(matches!(
            err,
            GpxError::InvalidValue {
                source: ValueError::InvalidDgpsStation(_),
                ..
            }
        ));
        let err = parse(&format!(r#"<wpt {NS} lat="0" lon="0"><ele>high</ele></wpt>"#)).unwrap_err();
        assert!(matches!(err, GpxError::InvalidValue { field: "ele", .. }));
    }

    #[test]
    fn test_empty_text_is_absent() {
        let wpt = parse(&format!(r#"<wpt {NS} lat="0" lon="0"><name></name><fix/></wpt>"#)).unwrap();
        assert_eq!(wpt.name, None);
        assert_eq!(wpt.fix, None);
    }

    #[test]
    fn test_foreign_namespace_not_mistaken_for_core() {
        let xml = format!(
            r#"<wpt {NS} xmlns:x="urn:x" lat="0" lon="0"><x:name>foreign</x:name><name>core</name></wpt>"#
        );
        let wpt = parse(&xml).unwrap();
        assert_eq!(wpt.name.as_deref(), Some("core"));
    }

    #[test]
    fn test_from_coords() {
        let wpt = Waypoint::from_coords(52.52, 13.405, Some(34.5)).unwrap();
        assert_eq!(wpt.lat.to_string(), "52.52");
        assert_eq!(wpt.elevation(), Some(34.5));
        assert!(Waypoint::from_coords(95.0, 0.0, None).is_err());
    }
}
