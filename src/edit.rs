//! In-place document transformations behind `gpxkit edit` and `gpxkit merge`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::{Result, ValueError};
use crate::marshal::parse_datetime;
use crate::models::{Bounds, Gpx, Waypoint};

/// Keeps only points accepted by `keep`, then drops routes, segments and
/// tracks left without points.
fn retain_points(gpx: &mut Gpx, keep: impl Fn(&Waypoint) -> bool) {
    gpx.waypoints.retain(|p| keep(p));
    for route in &mut gpx.routes {
        route.points.retain(|p| keep(p));
    }
    gpx.routes.retain(|r| !r.points.is_empty());
    for track in &mut gpx.tracks {
        for segment in &mut track.segments {
            segment.points.retain(|p| keep(p));
        }
        track.segments.retain(|s| !s.points.is_empty());
    }
    gpx.tracks.retain(|t| !t.segments.is_empty());
}

/// Removes every point outside `bounds` (edges inclusive).
pub fn crop(gpx: &mut Gpx, bounds: &Bounds) {
    retain_points(gpx, |p| bounds.contains(p.lat.value(), p.lon.value()));
}

/// Removes timed points outside `[start, end]`. Untimed points are kept.
pub fn trim(gpx: &mut Gpx, start: Option<DateTime<FixedOffset>>, end: Option<DateTime<FixedOffset>>) {
    retain_points(gpx, |p| match p.time {
        None => true,
        Some(t) => start.is_none_or(|s| t >= s) && end.is_none_or(|e| t <= e),
    });
}

pub fn reverse_routes(gpx: &mut Gpx) {
    for route in &mut gpx.routes {
        route.points.reverse();
    }
}

/// Reverses segment order and the points within each segment.
pub fn reverse_tracks(gpx: &mut Gpx) {
    for track in &mut gpx.tracks {
        track.segments.reverse();
        for segment in &mut track.segments {
            segment.points.reverse();
        }
    }
}

/// Metadata fields selected for removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataFields {
    pub name: bool,
    pub desc: bool,
    pub author: bool,
    pub copyright: bool,
    pub time: bool,
    pub keywords: bool,
    pub links: bool,
}

impl MetadataFields {
    pub const ALL: MetadataFields = MetadataFields {
        name: true,
        desc: true,
        author: true,
        copyright: true,
        time: true,
        keywords: true,
        links: true,
    };
}

/// Clears the selected fields; with [`MetadataFields::ALL`], or when nothing
/// remains, the metadata element is removed entirely.
pub fn strip_metadata(gpx: &mut Gpx, fields: MetadataFields) {
    if fields == MetadataFields::ALL {
        gpx.metadata = None;
        return;
    }
    let Some(metadata) = gpx.metadata.as_mut() else {
        return;
    };
    if fields.name {
        metadata.name = None;
    }
    if fields.desc {
        metadata.desc = None;
    }
    if fields.author {
        metadata.author = None;
    }
    if fields.copyright {
        metadata.copyright = None;
    }
    if fields.time {
        metadata.time = None;
    }
    if fields.keywords {
        metadata.keywords = None;
    }
    if fields.links {
        metadata.links.clear();
    }
    if metadata.is_empty() {
        gpx.metadata = None;
    }
}

/// Rounds coordinates and elevations of every point to the given number of
/// decimal places.
pub fn round_precision(gpx: &mut Gpx, coordinate_digits: Option<u32>, elevation_digits: Option<u32>) {
    for point in gpx.points_mut() {
        if let Some(digits) = coordinate_digits {
            point.lat = point.lat.round(digits);
            point.lon = point.lon.round(digits);
        }
        if let (Some(digits), Some(ele)) = (elevation_digits, &point.ele) {
            point.ele = Some(ele.round(digits));
        }
    }
}

/// Concatenates waypoints, routes and tracks in input order. Metadata is
/// dropped; namespace prefixes from every input are kept.
pub fn merge(documents: Vec<Gpx>, creator: &str) -> Gpx {
    let mut merged = Gpx::new(creator);
    for gpx in documents {
        merged.namespaces.merge(&gpx.namespaces);
        merged.waypoints.extend(gpx.waypoints);
        merged.routes.extend(gpx.routes);
        merged.tracks.extend(gpx.tracks);
    }
    log::debug!(
        "merged into {} waypoints, {} routes, {} tracks",
        merged.waypoints.len(),
        merged.routes.len(),
        merged.tracks.len()
    );
    merged
}

/// Reads a trim boundary. Besides full timestamps this accepts
/// `YYYY-MM-DDTHH:MM[:SS]` and `YYYY-MM-DD`, taken as UTC.
pub fn parse_time_bound(text: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(dt) = parse_datetime(text) {
        return Ok(dt);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| ValueError::InvalidDateTime(text.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="t">
  <metadata><name>Ride</name><desc>Morning</desc><keywords>bike</keywords></metadata>
  <wpt lat="10" lon="10"><name>inside</name></wpt>
  <wpt lat="50" lon="50"><name>outside</name></wpt>
  <rte><rtept lat="10" lon="10"/><rtept lat="11" lon="11"/><rtept lat="60" lon="60"/></rte>
  <rte><rtept lat="70" lon="70"/></rte>
  <trk>
    <trkseg>
      <trkpt lat="10.123456" lon="10.987654"><ele>100.456</ele><time>2024-01-01T10:00:00Z</time></trkpt>
      <trkpt lat="11" lon="11"><time>2024-01-01T11:00:00Z</time></trkpt>
      <trkpt lat="12" lon="12"/>
    </trkseg>
    <trkseg>
      <trkpt lat="60" lon="60"><time>2024-01-01T12:00:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    fn doc() -> Gpx {
        Gpx::from_string(DOC).unwrap()
    }

    #[test]
    fn test_crop() {
        let mut gpx = doc();
        let bounds = Bounds::new(
            "0".parse().unwrap(),
            "0".parse().unwrap(),
            "20".parse().unwrap(),
            "20".parse().unwrap(),
        );
        crop(&mut gpx, &bounds);
        assert_eq!(gpx.waypoints.len(), 1);
        assert_eq!(gpx.waypoints[0].name.as_deref(), Some("inside"));
        assert_eq!(gpx.routes.len(), 1);
        assert_eq!(gpx.routes[0].points.len(), 2);
        assert_eq!(gpx.tracks[0].segments.len(), 1);
    }

    #[test]
    fn test_trim_keeps_untimed() {
        let mut gpx = doc();
        let start = parse_time_bound("2024-01-01T10:30:00Z").unwrap();
        let end = parse_time_bound("2024-01-01T11:30").unwrap();
        trim(&mut gpx, Some(start), Some(end));
        assert_eq!(gpx.waypoints.len(), 2);
        let lats: Vec<f64> = gpx.tracks[0].points().map(|p| p.lat.value()).collect();
        assert_eq!(lats, [11.0, 12.0]);
        assert_eq!(gpx.tracks[0].segments.len(), 1);
    }

    #[test]
    fn test_reverse() {
        let mut gpx = doc();
        reverse_routes(&mut gpx);
        assert_eq!(gpx.routes[0].points[0].lat.value(), 60.0);

        reverse_tracks(&mut gpx);
        let lats: Vec<f64> = gpx.tracks[0].points().map(|p| p.lat.value()).collect();
        assert_eq!(lats, [60.0, 12.0, 11.0, 10.123456]);
    }

    #[test]
    fn test_strip_metadata() {
        let mut gpx = doc();
        strip_metadata(
            &mut gpx,
            MetadataFields {
                name: true,
                keywords: true,
                ..Default::default()
            },
        );
        assert_eq!(gpx.name(), None);
        assert_eq!(gpx.desc(), Some("Morning"));

        strip_metadata(
            &mut gpx,
            MetadataFields {
                desc: true,
                ..Default::default()
            },
        );
        assert!(gpx.metadata.is_none());

        let mut gpx = doc();
        strip_metadata(&mut gpx, MetadataFields::ALL);
        assert!(gpx.metadata.is_none());
    }

    #[test]
    fn test_round_precision() {
        let mut gpx = doc();
        round_precision(&mut gpx, Some(3), Some(1));
        let p = &gpx.tracks[0].segments[0].points[0];
        assert_eq!(p.lat.to_string(), "10.123");
        assert_eq!(p.lon.to_string(), "10.988");
        assert_eq!(p.ele.as_ref().unwrap().to_string(), "100.5");
        assert_eq!(gpx.waypoints[0].lat.to_string(), "10");
    }

    #[test]
    fn test_merge() {
        let merged = merge(vec![doc(), doc()], "merger");
        assert_eq!(merged.creator, "merger");
        assert_eq!(merged.waypoints.len(), 4);
        assert_eq!(merged.routes.len(), 4);
        assert_eq!(merged.tracks.len(), 2);
        assert!(merged.metadata.is_none());
    }

    #[test]
    fn test_parse_time_bound_formats() {
        let day = parse_time_bound("2024-01-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        let offset = parse_time_bound("2024-01-01T10:00:00+02:00").unwrap();
        assert_eq!(offset.offset().local_minus_utc(), 7200);
        assert!(parse_time_bound("yesterday").is_err());
    }
}
