//! Well-Known Binary output and input.
//!
//! Output uses ISO type codes (Z as +1000). Input also accepts EWKB flags,
//! and M values are read and discarded.

use geojson::{GeoJson, Geometry, Value};

use crate::converter;
use crate::error::{GpxError, Result};
use crate::models::{Gpx, Route, Track, Waypoint};

const POINT: u32 = 1;
const LINESTRING: u32 = 2;
const POLYGON: u32 = 3;
const MULTIPOINT: u32 = 4;
const MULTILINESTRING: u32 = 5;
const MULTIPOLYGON: u32 = 6;
const GEOMETRYCOLLECTION: u32 = 7;

const ISO_Z_OFFSET: u32 = 1000;
const EWKB_Z_FLAG: u32 = 0x8000_0000;
const EWKB_M_FLAG: u32 = 0x4000_0000;
const EWKB_SRID_FLAG: u32 = 0x2000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// XDR, marker byte 0.
    BigEndian,
    /// NDR, marker byte 1.
    #[default]
    LittleEndian,
}

impl ByteOrder {
    fn marker(self) -> u8 {
        match self {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        }
    }
}

/// Encodes the document as one geometry: the single element's own geometry,
/// or a geometry collection of all of them.
pub fn to_wkb(gpx: &Gpx, order: ByteOrder) -> Vec<u8> {
    let mut writer = Writer {
        order,
        out: Vec::new(),
    };
    let count = gpx.waypoints.len() + gpx.routes.len() + gpx.tracks.len();
    if count == 1 {
        if let Some(p) = gpx.waypoints.first() {
            writer.point(p);
        } else if let Some(r) = gpx.routes.first() {
            writer.route(r);
        } else if let Some(t) = gpx.tracks.first() {
            writer.track(t);
        }
    } else {
        writer.header(GEOMETRYCOLLECTION, false);
        writer.count(count);
        gpx.waypoints.iter().for_each(|p| writer.point(p));
        gpx.routes.iter().for_each(|r| writer.route(r));
        gpx.tracks.iter().for_each(|t| writer.track(t));
    }
    writer.out
}

struct Writer {
    order: ByteOrder,
    out: Vec<u8>,
}

impl Writer {
    fn u32(&mut self, v: u32) {
        match self.order {
            ByteOrder::BigEndian => self.out.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::LittleEndian => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn f64(&mut self, v: f64) {
        match self.order {
            ByteOrder::BigEndian => self.out.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::LittleEndian => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn count(&mut self, n: usize) {
        self.u32(n as u32);
    }

    fn header(&mut self, kind: u32, with_z: bool) {
        self.out.push(self.order.marker());
        self.u32(if with_z { kind + ISO_Z_OFFSET } else { kind });
    }

    fn coord(&mut self, p: &Waypoint, with_z: bool) {
        self.f64(p.lon.value());
        self.f64(p.lat.value());
        if with_z {
            self.f64(p.elevation().unwrap_or(0.0));
        }
    }

    fn line_body(&mut self, points: &[Waypoint], with_z: bool) {
        self.count(points.len());
        for p in points {
            self.coord(p, with_z);
        }
    }

    fn point(&mut self, p: &Waypoint) {
        let with_z = p.ele.is_some();
        self.header(POINT, with_z);
        self.coord(p, with_z);
    }

    fn route(&mut self, r: &Route) {
        let with_z = all_have_elevation(&r.points);
        self.header(LINESTRING, with_z);
        self.line_body(&r.points, with_z);
    }

    fn track(&mut self, t: &Track) {
        let with_z = all_have_elevation(t.points());
        self.header(MULTILINESTRING, with_z);
        self.count(t.segments.len());
        for segment in &t.segments {
            self.header(LINESTRING, with_z);
            self.line_body(&segment.points, with_z);
        }
    }
}

fn all_have_elevation<'a>(points: impl IntoIterator<Item = &'a Waypoint>) -> bool {
    let mut points = points.into_iter().peekable();
    points.peek().is_some() && points.all(|p| p.ele.is_some())
}

/// Decodes a WKB geometry into a GPX document.
pub fn from_wkb(wkb: &[u8], creator: &str) -> Result<Gpx> {
    let mut reader = Reader { data: wkb, pos: 0 };
    let value = reader.geometry()?;
    if reader.pos < wkb.len() {
        log::warn!(
            "ignoring {} trailing bytes after WKB geometry",
            wkb.len() - reader.pos
        );
    }
    converter::from_geojson(&GeoJson::Geometry(Geometry::new(value)), creator)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    order: ByteOrder,
    z: bool,
    m: bool,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| GpxError::InvalidWkb("unexpected end of data".to_string()))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u32(&mut self, order: ByteOrder) -> Result<u32> {
        let bytes = self.take::<4>()?;
        Ok(match order {
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
        })
    }

    fn f64(&mut self, order: ByteOrder) -> Result<f64> {
        let bytes = self.take::<8>()?;
        Ok(match order {
            ByteOrder::BigEndian => f64::from_be_bytes(bytes),
            ByteOrder::LittleEndian => f64::from_le_bytes(bytes),
        })
    }

    fn geometry(&mut self) -> Result<Value> {
        let order = match self.take::<1>()?[0] {
            0 => ByteOrder::BigEndian,
            1 => ByteOrder::LittleEndian,
            other => {
                return Err(GpxError::InvalidWkb(format!("invalid byte order {other}")));
            }
        };
        let code = self.u32(order)?;

        let mut layout = Layout {
            order,
            z: code & EWKB_Z_FLAG != 0,
            m: code & EWKB_M_FLAG != 0,
        };
        if code & EWKB_SRID_FLAG != 0 {
            self.u32(order)?;
        }
        let iso = code & 0x0FFF_FFFF;
        match iso / 1000 {
            0 => {}
            1 => layout.z = true,
            2 => layout.m = true,
            3 => {
                layout.z = true;
                layout.m = true;
            }
            _ => return Err(GpxError::InvalidWkb(format!("unknown geometry type {code}"))),
        }

        let value = match iso % 1000 {
            POINT => Value::Point(self.coord(layout)?),
            LINESTRING => Value::LineString(self.line(layout)?),
            POLYGON => {
                let rings = self.u32(order)?;
                Value::Polygon((0..rings).map(|_| self.line(layout)).collect::<Result<_>>()?)
            }
            MULTIPOINT => {
                let members = self.members(order)?;
                Value::MultiPoint(
                    members
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::Point(p) => Some(p),
                            _ => None,
                        })
                        .collect(),
                )
            }
            MULTILINESTRING => {
                let members = self.members(order)?;
                Value::MultiLineString(
                    members
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::LineString(l) => Some(l),
                            _ => None,
                        })
                        .collect(),
                )
            }
            MULTIPOLYGON => {
                let members = self.members(order)?;
                Value::MultiPolygon(
                    members
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::Polygon(p) => Some(p),
                            _ => None,
                        })
                        .collect(),
                )
            }
            GEOMETRYCOLLECTION => {
                Value::GeometryCollection(self.members(order)?.into_iter().map(Geometry::new).collect())
            }
            other => {
                return Err(GpxError::InvalidWkb(format!("unknown geometry type {other}")));
            }
        };
        Ok(value)
    }

    /// Nested geometries carry their own byte order and type header; the
    /// count uses the enclosing one.
    fn members(&mut self, order: ByteOrder) -> Result<Vec<Value>> {
        let n = self.u32(order)?;
        (0..n).map(|_| self.geometry()).collect()
    }

    fn line(&mut self, layout: Layout) -> Result<Vec<Vec<f64>>> {
        let n = self.u32(layout.order)?;
        (0..n).map(|_| self.coord(layout)).collect()
    }

    fn coord(&mut self, layout: Layout) -> Result<Vec<f64>> {
        let x = self.f64(layout.order)?;
        let y = self.f64(layout.order)?;
        let mut out = vec![x, y];
        if layout.z {
            out.push(self.f64(layout.order)?);
        }
        if layout.m {
            self.f64(layout.order)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackSegment;

    fn waypoint(lat: f64, lon: f64, ele: Option<f64>) -> Waypoint {
        Waypoint::from_coords(lat, lon, ele).unwrap()
    }

    fn le_point(code: u32, coords: &[f64]) -> Vec<u8> {
        let mut out = vec![1u8];
        out.extend_from_slice(&code.to_le_bytes());
        for c in coords {
            out.extend_from_slice(&c.to_le_bytes());
        }
        out
    }

    fn type_code(wkb: &[u8]) -> u32 {
        u32::from_le_bytes([wkb[1], wkb[2], wkb[3], wkb[4]])
    }

    #[test]
    fn test_byte_order_marker() {
        let mut gpx = Gpx::default();
        gpx.waypoints.push(waypoint(52.52, 13.405, None));
        assert_eq!(to_wkb(&gpx, ByteOrder::LittleEndian)[0], 1);
        let big = to_wkb(&gpx, ByteOrder::BigEndian);
        assert_eq!(big[0], 0);
        assert_eq!(u32::from_be_bytes([big[1], big[2], big[3], big[4]]), POINT);
    }

    #[test]
    fn test_type_codes() {
        let mut gpx = Gpx::default();
        gpx.waypoints.push(waypoint(52.52, 13.405, Some(34.5)));
        assert_eq!(type_code(&to_wkb(&gpx, ByteOrder::default())), 1001);

        let mut gpx = Gpx::default();
        gpx.routes.push(Route {
            points: vec![waypoint(52.52, 13.405, None), waypoint(52.53, 13.415, None)],
            ..Default::default()
        });
        assert_eq!(type_code(&to_wkb(&gpx, ByteOrder::default())), LINESTRING);

        gpx.tracks.push(Track::default());
        assert_eq!(type_code(&to_wkb(&gpx, ByteOrder::default())), GEOMETRYCOLLECTION);
    }

    #[test]
    fn test_read_point_z() {
        let gpx = from_wkb(&le_point(1001, &[13.405, 52.52, 34.5]), "t").unwrap();
        assert_eq!(gpx.waypoints.len(), 1);
        assert_eq!(gpx.waypoints[0].ele, Some("34.5".parse().unwrap()));

        let ewkb = le_point(EWKB_Z_FLAG | POINT, &[13.405, 52.52, 34.5]);
        let gpx = from_wkb(&ewkb, "t").unwrap();
        assert_eq!(gpx.waypoints[0].elevation(), Some(34.5));
    }

    #[test]
    fn test_read_measured_point() {
        let gpx = from_wkb(&le_point(2001, &[13.405, 52.52, 7.0]), "t").unwrap();
        assert_eq!(gpx.waypoints[0].ele, None);
        let gpx = from_wkb(&le_point(3001, &[13.405, 52.52, 34.5, 7.0]), "t").unwrap();
        assert_eq!(gpx.waypoints[0].elevation(), Some(34.5));
    }

    #[test]
    fn test_read_multilinestring() {
        let mut wkb = vec![1u8];
        wkb.extend_from_slice(&MULTILINESTRING.to_le_bytes());
        wkb.extend_from_slice(&2u32.to_le_bytes());
        for line in [[13.405f64, 52.52, 13.406, 52.521], [13.407, 52.522, 13.408, 52.523]] {
            // members may use the other byte order
            wkb.push(0);
            wkb.extend_from_slice(&LINESTRING.to_be_bytes());
            wkb.extend_from_slice(&2u32.to_be_bytes());
            for c in line {
                wkb.extend_from_slice(&c.to_be_bytes());
            }
        }
        let gpx = from_wkb(&wkb, "t").unwrap();
        assert_eq!(gpx.tracks.len(), 1);
        assert_eq!(gpx.tracks[0].segments.len(), 2);
        assert_eq!(gpx.tracks[0].segments[1].points[1].lat.value(), 52.523);
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(from_wkb(&[2, 1, 0, 0, 0], "t"), Err(GpxError::InvalidWkb(_))));
        assert!(matches!(from_wkb(&[1, 1, 0], "t"), Err(GpxError::InvalidWkb(_))));
        assert!(matches!(
            from_wkb(&le_point(9, &[1.0, 2.0]), "t"),
            Err(GpxError::InvalidWkb(_))
        ));
        let truncated = &le_point(POINT, &[1.0, 2.0])[..12];
        assert!(matches!(from_wkb(truncated, "t"), Err(GpxError::InvalidWkb(_))));
    }

    #[test]
    fn test_round_trip() {
        let mut gpx = Gpx::new("t");
        gpx.waypoints.push(waypoint(52.52, 13.405, Some(34.5)));
        gpx.tracks.push(Track {
            segments: vec![
                TrackSegment {
                    points: vec![waypoint(1.0, 2.0, None), waypoint(3.0, 4.0, None)],
                    extensions: None,
                },
                TrackSegment {
                    points: vec![waypoint(5.0, 6.0, None), waypoint(7.0, 8.0, None)],
                    extensions: None,
                },
            ],
            ..Default::default()
        });
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
            let back = from_wkb(&to_wkb(&gpx, order), "t").unwrap();
            assert_eq!(back, gpx);
        }
    }
}
