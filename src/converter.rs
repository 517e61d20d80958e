use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::{GpxError, Result};
use crate::marshal::format_datetime;
use crate::models::{Bounds, Gpx, Link, Route, Track, TrackSegment, Waypoint};
use crate::options::{ConvertOptions, GpxElementType};

/// Convert a GPX document to a GeoJSON FeatureCollection.
pub fn to_feature_collection(data: &Gpx, opts: &ConvertOptions) -> FeatureCollection {
    let mut features = Vec::new();

    if opts.should_include(GpxElementType::Waypoint) {
        for wpt in &data.waypoints {
            features.push(single_point_feature(wpt, "waypoint", opts));
        }
    }

    if opts.should_include(GpxElementType::Route) {
        for rte in &data.routes {
            if rte.points.len() >= 2 {
                features.push(route_to_feature(rte, opts));
            } else if rte.points.len() == 1 {
                features.push(single_point_feature(&rte.points[0], "route", opts));
            }
        }
    }

    if opts.should_include(GpxElementType::Track) {
        for trk in &data.tracks {
            features.extend(track_to_features(trk, opts));
        }
    }

    log::debug!("converted GPX to {} GeoJSON features", features.len());
    collection(features)
}

fn route_to_feature(rte: &Route, opts: &ConvertOptions) -> Feature {
    let geometry = Geometry::new(Value::LineString(line_coords(&rte.points, opts)));

    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("route".to_string()),
    );

    if opts.include_metadata {
        insert_optional(&mut props, "name", &rte.name);
        insert_optional(&mut props, "cmt", &rte.cmt);
        insert_optional(&mut props, "desc", &rte.desc);
        insert_optional(&mut props, "src", &rte.src);
        insert_optional(&mut props, "type", &rte.kind);
        if let Some(n) = rte.number {
            props.insert("number".to_string(), JsonValue::Number(n.into()));
        }
        insert_link(&mut props, &rte.links);
    }

    if opts.include_time {
        insert_coordinate_times(&mut props, &rte.points);
    }

    feature(geometry, props)
}

fn track_to_features(trk: &Track, opts: &ConvertOptions) -> Vec<Feature> {
    let non_empty_segments: Vec<&TrackSegment> =
        trk.segments.iter().filter(|s| !s.points.is_empty()).collect();

    if non_empty_segments.is_empty() {
        return Vec::new();
    }

    // Single point across all segments → Point Feature
    let total_points: usize = non_empty_segments.iter().map(|s| s.points.len()).sum();
    if total_points == 1 {
        let pt = &non_empty_segments[0].points[0];
        return vec![single_point_feature(pt, "track", opts)];
    }

    let drawable: Vec<&TrackSegment> = non_empty_segments
        .into_iter()
        .filter(|s| s.points.len() >= 2)
        .collect();

    if drawable.len() == 1 {
        let seg = drawable[0];
        let geometry = Geometry::new(Value::LineString(line_coords(&seg.points, opts)));
        let mut props = build_track_props(trk, opts);
        if opts.include_time {
            insert_coordinate_times(&mut props, &seg.points);
        }
        return vec![feature(geometry, props)];
    }

    if opts.join_track_segments {
        if drawable.is_empty() {
            return Vec::new();
        }

        let line_strings: Vec<Vec<Vec<f64>>> = drawable
            .iter()
            .map(|seg| line_coords(&seg.points, opts))
            .collect();
        let geometry = Geometry::new(Value::MultiLineString(line_strings));
        let mut props = build_track_props(trk, opts);

        if opts.include_time {
            let all_times: Vec<Vec<JsonValue>> =
                drawable.iter().map(|seg| point_times(&seg.points)).collect();
            if all_times.iter().any(|times| times.iter().any(|t| !t.is_null())) {
                let mut coord_props = Map::new();
                coord_props.insert(
                    "times".to_string(),
                    JsonValue::Array(all_times.into_iter().map(JsonValue::Array).collect()),
                );
                props.insert(
                    "coordinateProperties".to_string(),
                    JsonValue::Object(coord_props),
                );
            }
        }

        vec![feature(geometry, props)]
    } else {
        // Each segment as a separate Feature
        drawable
            .iter()
            .map(|seg| {
                let geometry = Geometry::new(Value::LineString(line_coords(&seg.points, opts)));
                let mut props = build_track_props(trk, opts);
                if opts.include_time {
                    insert_coordinate_times(&mut props, &seg.points);
                }
                feature(geometry, props)
            })
            .collect()
    }
}

fn single_point_feature(pt: &Waypoint, gpx_type: &str, opts: &ConvertOptions) -> Feature {
    let geometry = Geometry::new(Value::Point(point_coords(pt, opts.include_elevation)));

    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String(gpx_type.to_string()),
    );

    if opts.include_metadata {
        insert_point_metadata(&mut props, pt);
    }

    feature(geometry, props)
}

fn build_track_props(trk: &Track, opts: &ConvertOptions) -> Map<String, JsonValue> {
    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("track".to_string()),
    );

    if opts.include_metadata {
        insert_optional(&mut props, "name", &trk.name);
        insert_optional(&mut props, "cmt", &trk.cmt);
        insert_optional(&mut props, "desc", &trk.desc);
        insert_optional(&mut props, "src", &trk.src);
        insert_optional(&mut props, "type", &trk.kind);
        if let Some(n) = trk.number {
            props.insert("number".to_string(), JsonValue::Number(n.into()));
        }
        insert_link(&mut props, &trk.links);
    }

    props
}

fn feature(geometry: Geometry, props: Map<String, JsonValue>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &Waypoint, include_elevation: bool) -> Vec<f64> {
    match (include_elevation, pt.elevation()) {
        (true, Some(ele)) => vec![pt.lon.value(), pt.lat.value(), ele],
        _ => vec![pt.lon.value(), pt.lat.value()],
    }
}

fn line_coords(points: &[Waypoint], opts: &ConvertOptions) -> Vec<Vec<f64>> {
    points
        .iter()
        .map(|pt| point_coords(pt, opts.include_elevation))
        .collect()
}

fn insert_point_metadata(props: &mut Map<String, JsonValue>, pt: &Waypoint) {
    insert_optional(props, "name", &pt.name);
    insert_optional(props, "cmt", &pt.cmt);
    insert_optional(props, "desc", &pt.desc);
    insert_optional(props, "src", &pt.src);
    insert_optional(props, "sym", &pt.sym);
    insert_optional(props, "type", &pt.kind);
    if let Some(ele) = pt.elevation() {
        props.insert(
            "ele".to_string(),
            JsonValue::Number(serde_json::Number::from_f64(ele).unwrap_or(0.into())),
        );
    }
    if let Some(ref time) = pt.time {
        props.insert("time".to_string(), JsonValue::String(format_datetime(time)));
    }
    insert_link(props, &pt.links);
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}

/// Only the first link is carried; GeoJSON consumers expect a single object.
fn insert_link(props: &mut Map<String, JsonValue>, links: &[Link]) {
    if let Some(link) = links.first() {
        let mut link_obj = Map::new();
        link_obj.insert("href".to_string(), JsonValue::String(link.href.clone()));
        if let Some(ref t) = link.text {
            link_obj.insert("text".to_string(), JsonValue::String(t.clone()));
        }
        if let Some(ref lt) = link.kind {
            link_obj.insert("type".to_string(), JsonValue::String(lt.clone()));
        }
        props.insert("link".to_string(), JsonValue::Object(link_obj));
    }
}

fn point_times(points: &[Waypoint]) -> Vec<JsonValue> {
    points
        .iter()
        .map(|pt| match &pt.time {
            Some(t) => JsonValue::String(format_datetime(t)),
            None => JsonValue::Null,
        })
        .collect()
}

fn insert_coordinate_times(props: &mut Map<String, JsonValue>, points: &[Waypoint]) {
    let times = point_times(points);

    // Only include if at least one time is present
    if times.iter().any(|t| !t.is_null()) {
        let mut coord_props = Map::new();
        coord_props.insert("times".to_string(), JsonValue::Array(times));
        props.insert(
            "coordinateProperties".to_string(),
            JsonValue::Object(coord_props),
        );
    }
}

// Geo interface: direct GeoJSON views of single records.

/// `[minlon, minlat, maxlon, maxlat]`, or six values with elevation when
/// any point carries one.
fn bbox<'a>(points: impl IntoIterator<Item = &'a Waypoint>) -> Option<Vec<f64>> {
    let mut lon = (f64::INFINITY, f64::NEG_INFINITY);
    let mut lat = (f64::INFINITY, f64::NEG_INFINITY);
    let mut ele: Option<(f64, f64)> = None;
    let mut seen = false;
    for pt in points {
        seen = true;
        lon = (lon.0.min(pt.lon.value()), lon.1.max(pt.lon.value()));
        lat = (lat.0.min(pt.lat.value()), lat.1.max(pt.lat.value()));
        if let Some(e) = pt.elevation() {
            ele = Some(match ele {
                Some((lo, hi)) => (lo.min(e), hi.max(e)),
                None => (e, e),
            });
        }
    }
    if !seen {
        return None;
    }
    Some(match ele {
        Some((lo, hi)) => vec![lon.0, lat.0, lo, lon.1, lat.1, hi],
        None => vec![lon.0, lat.0, lon.1, lat.1],
    })
}

fn all_coords(points: &[Waypoint]) -> Vec<Vec<f64>> {
    points.iter().map(|pt| point_coords(pt, true)).collect()
}

fn named_props(name: &Option<String>, desc: &Option<String>) -> Map<String, JsonValue> {
    let mut props = Map::new();
    insert_optional(&mut props, "name", name);
    insert_optional(&mut props, "desc", desc);
    props
}

impl Waypoint {
    /// A Point feature carrying name, description, elevation and time.
    pub fn to_geojson(&self) -> Feature {
        let mut props = Map::new();
        insert_point_metadata(&mut props, self);
        feature(Geometry::new(Value::Point(point_coords(self, true))), props)
    }
}

impl TrackSegment {
    pub fn to_geojson(&self) -> Geometry {
        let mut geometry = Geometry::new(Value::LineString(all_coords(&self.points)));
        geometry.bbox = bbox(&self.points);
        geometry
    }
}

impl Route {
    pub fn to_geojson(&self) -> Feature {
        let mut geometry = Geometry::new(Value::LineString(all_coords(&self.points)));
        geometry.bbox = bbox(&self.points);
        let mut out = feature(geometry, named_props(&self.name, &self.desc));
        out.bbox = bbox(&self.points);
        out
    }
}

impl Track {
    /// A MultiLineString feature with one line per segment.
    pub fn to_geojson(&self) -> Feature {
        let lines = self.segments.iter().map(|s| all_coords(&s.points)).collect();
        let mut geometry = Geometry::new(Value::MultiLineString(lines));
        geometry.bbox = bbox(self.points());
        let mut out = feature(geometry, named_props(&self.name, &self.desc));
        out.bbox = bbox(self.points());
        out
    }
}

impl Bounds {
    /// The box as a closed polygon ring, counter-clockwise from the south-west.
    pub fn to_geojson(&self) -> Geometry {
        let (minlat, minlon, maxlat, maxlon) = self.as_tuple();
        let ring = vec![
            vec![minlon, minlat],
            vec![maxlon, minlat],
            vec![maxlon, maxlat],
            vec![minlon, maxlat],
            vec![minlon, minlat],
        ];
        let mut geometry = Geometry::new(Value::Polygon(vec![ring]));
        geometry.bbox = Some(vec![minlon, minlat, maxlon, maxlat]);
        geometry
    }
}

impl Gpx {
    /// Waypoints, then routes, then tracks, each through its own geo interface.
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .waypoints
            .iter()
            .map(Waypoint::to_geojson)
            .chain(self.routes.iter().map(Route::to_geojson))
            .chain(self.tracks.iter().map(Track::to_geojson))
            .collect();
        let mut out = collection(features);
        out.bbox = bbox(self.points());
        out
    }
}

/// Build a GPX document from GeoJSON.
///
/// Points become waypoints, LineStrings routes, and MultiLineStrings tracks
/// with one segment per line. Polygons nested in a collection are skipped;
/// a polygon on its own is an error.
pub fn from_geojson(geojson: &GeoJson, creator: &str) -> Result<Gpx> {
    let mut gpx = Gpx::new(creator);
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for f in &fc.features {
                add_feature(&mut gpx, f, true)?;
            }
        }
        GeoJson::Feature(f) => add_feature(&mut gpx, f, false)?,
        GeoJson::Geometry(g) => add_geometry(&mut gpx, &g.value, None, false)?,
    }
    log::debug!(
        "built GPX from GeoJSON: {} waypoints, {} routes, {} tracks",
        gpx.waypoints.len(),
        gpx.routes.len(),
        gpx.tracks.len()
    );
    Ok(gpx)
}

fn add_feature(gpx: &mut Gpx, f: &Feature, nested: bool) -> Result<()> {
    match &f.geometry {
        Some(geometry) => add_geometry(gpx, &geometry.value, f.properties.as_ref(), nested),
        None => Ok(()),
    }
}

fn add_geometry(
    gpx: &mut Gpx,
    value: &Value,
    props: Option<&JsonObject>,
    nested: bool,
) -> Result<()> {
    match value {
        Value::Point(pos) => {
            let mut wpt = position_to_waypoint(pos)?;
            apply_point_props(&mut wpt, props);
            gpx.waypoints.push(wpt);
        }
        Value::MultiPoint(positions) => {
            for pos in positions {
                let mut wpt = position_to_waypoint(pos)?;
                apply_point_props(&mut wpt, props);
                gpx.waypoints.push(wpt);
            }
        }
        Value::LineString(line) if gpx_type(props) == Some("track") => {
            let mut trk = Track::default();
            trk.segments.push(TrackSegment {
                points: positions_to_waypoints(line)?,
                extensions: None,
            });
            apply_path_props(&mut trk.name, &mut trk.desc, &mut trk.cmt, &mut trk.kind, props);
            gpx.tracks.push(trk);
        }
        Value::LineString(line) => {
            let mut rte = Route {
                points: positions_to_waypoints(line)?,
                ..Default::default()
            };
            apply_path_props(&mut rte.name, &mut rte.desc, &mut rte.cmt, &mut rte.kind, props);
            gpx.routes.push(rte);
        }
        Value::MultiLineString(lines) => {
            let mut trk = Track::default();
            for line in lines {
                trk.segments.push(TrackSegment {
                    points: positions_to_waypoints(line)?,
                    extensions: None,
                });
            }
            apply_path_props(&mut trk.name, &mut trk.desc, &mut trk.cmt, &mut trk.kind, props);
            gpx.tracks.push(trk);
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                add_geometry(gpx, &g.value, props, true)?;
            }
        }
        Value::Polygon(_) | Value::MultiPolygon(_) => {
            let kind = geometry_name(value);
            if nested {
                log::warn!("skipping {kind} geometry, GPX has no area type");
            } else {
                return Err(GpxError::UnsupportedGeometry(kind.to_string()));
            }
        }
    }
    Ok(())
}

fn geometry_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn position_to_waypoint(pos: &[f64]) -> Result<Waypoint> {
    match pos {
        [lon, lat] => Waypoint::from_coords(*lat, *lon, None),
        [lon, lat, ele, ..] => Waypoint::from_coords(*lat, *lon, Some(*ele)),
        _ => Err(GpxError::Invalid(format!(
            "GeoJSON position needs at least two values, got {}",
            pos.len()
        ))),
    }
}

fn positions_to_waypoints(positions: &[Vec<f64>]) -> Result<Vec<Waypoint>> {
    positions.iter().map(|p| position_to_waypoint(p)).collect()
}

fn string_prop(props: &JsonObject, key: &str) -> Option<String> {
    props.get(key)?.as_str().map(str::to_string)
}

/// The `gpxType` written by [`to_feature_collection`], if any.
fn gpx_type(props: Option<&JsonObject>) -> Option<&str> {
    props?.get("gpxType")?.as_str()
}

fn apply_path_props(
    name: &mut Option<String>,
    desc: &mut Option<String>,
    cmt: &mut Option<String>,
    kind: &mut Option<String>,
    props: Option<&JsonObject>,
) {
    if let Some(props) = props {
        *name = string_prop(props, "name");
        *desc = string_prop(props, "desc");
        *cmt = string_prop(props, "cmt");
        *kind = string_prop(props, "type");
    }
}

fn apply_point_props(wpt: &mut Waypoint, props: Option<&JsonObject>) {
    if let Some(props) = props {
        wpt.name = string_prop(props, "name");
        wpt.desc = string_prop(props, "desc");
        wpt.cmt = string_prop(props, "cmt");
        wpt.sym = string_prop(props, "sym");
        wpt.kind = string_prop(props, "type");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_gpx(xml: &str) -> Result<Gpx> {
        Gpx::from_string(xml)
    }

    #[test]
    fn test_waypoint_conversion() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <wpt lat="35.6762" lon="139.6503">
    <ele>40.5</ele>
    <name>Tokyo</name>
  </wpt>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let fc = to_feature_collection(&data, &ConvertOptions::default());

        assert_eq!(fc.features.len(), 1);
        let f = &fc.features[0];
        let geom = f.geometry.as_ref().unwrap();

        // Check [lon, lat, ele] order
        if let Value::Point(coords) = &geom.value {
            assert!((coords[0] - 139.6503).abs() < 1e-10); // lon
            assert!((coords[1] - 35.6762).abs() < 1e-10); // lat
            assert!((coords[2] - 40.5).abs() < 1e-10); // ele
        } else {
            panic!("Expected Point geometry");
        }

        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "waypoint");
        assert_eq!(props["name"], "Tokyo");
        assert_eq!(props["ele"], 40.5);
    }

    #[test]
    fn test_track_with_times() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Run</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><time>2025-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="35.001" lon="139.001"><time>2025-01-01T00:01:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let fc = to_feature_collection(&data, &ConvertOptions::default());

        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "track");
        assert_eq!(props["name"], "Run");

        let coord_props = props["coordinateProperties"].as_object().unwrap();
        let times = coord_props["times"].as_array().unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], "2025-01-01T00:00:00Z");
    }

    const TWO_SEGMENTS: &str = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Trail</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"/>
      <trkpt lat="35.001" lon="139.001"/>
    </trkseg>
    <trkseg>
      <trkpt lat="36.0" lon="140.0"/>
      <trkpt lat="36.001" lon="140.001"/>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_multi_segment_join() {
        let data = parse_gpx(TWO_SEGMENTS).unwrap();
        let opts = ConvertOptions {
            join_track_segments: true,
            ..Default::default()
        };
        let fc = to_feature_collection(&data, &opts);

        assert_eq!(fc.features.len(), 1);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        match &geom.value {
            Value::MultiLineString(lines) => {
                assert_eq!(lines.len(), 2);
            }
            _ => panic!("Expected MultiLineString"),
        }
    }

    #[test]
    fn test_multi_segment_separate() {
        let data = parse_gpx(TWO_SEGMENTS).unwrap();
        let fc = to_feature_collection(&data, &ConvertOptions::default());

        // Each segment is a separate Feature
        assert_eq!(fc.features.len(), 2);
        for f in &fc.features {
            let props = f.properties.as_ref().unwrap();
            assert_eq!(props["gpxType"], "track");
            assert_eq!(props["name"], "Trail");
        }
    }

    #[test]
    fn test_single_point_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Single</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"/>
    </trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let fc = to_feature_collection(&data, &ConvertOptions::default());

        assert_eq!(fc.features.len(), 1);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        match &geom.value {
            Value::Point(_) => {} // Expected: 1 point → Point Feature
            _ => panic!("Expected Point geometry for single-point track"),
        }
    }

    #[test]
    fn test_empty_gpx_conversion() {
        let xml = r#"<?xml version="1.0"?><gpx version="1.1" creator="test"></gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let fc = to_feature_collection(&data, &ConvertOptions::default());
        assert!(fc.features.is_empty());
    }

    #[test]
    fn test_no_elevation() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <wpt lat="35.0" lon="139.0"><ele>100.0</ele></wpt>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let opts = ConvertOptions {
            include_elevation: false,
            ..Default::default()
        };
        let fc = to_feature_collection(&data, &opts);

        let geom = fc.features[0].geometry.as_ref().unwrap();
        if let Value::Point(coords) = &geom.value {
            assert_eq!(coords.len(), 2); // No elevation
        }
    }

    #[test]
    fn test_type_filter() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <wpt lat="35.0" lon="139.0"/>
  <rte><rtept lat="35.0" lon="139.0"/><rtept lat="36.0" lon="140.0"/></rte>
  <trk><trkseg><trkpt lat="35.0" lon="139.0"/><trkpt lat="36.0" lon="140.0"/></trkseg></trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let opts = ConvertOptions {
            types: Some(vec![GpxElementType::Waypoint]),
            ..Default::default()
        };
        let fc = to_feature_collection(&data, &opts);

        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "waypoint");
    }

    #[test]
    fn test_track_geo_interface_bbox() {
        let xml = r#"<gpx version="1.1" creator="test">
  <trk><name>Loop</name>
    <trkseg><trkpt lat="1" lon="2"><ele>5</ele></trkpt><trkpt lat="3" lon="4"><ele>9</ele></trkpt></trkseg>
    <trkseg><trkpt lat="0" lon="6"/></trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let f = data.tracks[0].to_geojson();
        assert_eq!(f.bbox, Some(vec![2.0, 0.0, 5.0, 6.0, 3.0, 9.0]));
        match &f.geometry.as_ref().unwrap().value {
            Value::MultiLineString(lines) => assert_eq!(lines.len(), 2),
            _ => panic!("Expected MultiLineString"),
        }
        assert_eq!(f.properties.unwrap()["name"], "Loop");

        let seg = data.tracks[0].segments[1].to_geojson();
        assert_eq!(seg.bbox, Some(vec![6.0, 0.0, 6.0, 0.0]));
    }

    #[test]
    fn test_bounds_polygon_is_closed() {
        let bounds = Bounds::new(
            "1".parse().unwrap(),
            "2".parse().unwrap(),
            "3".parse().unwrap(),
            "4".parse().unwrap(),
        );
        match bounds.to_geojson().value {
            Value::Polygon(rings) => {
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0].first(), rings[0].last());
            }
            _ => panic!("Expected Polygon"),
        }
    }

    #[test]
    fn test_from_geojson_collection() {
        let json = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"name": "Summit", "sym": "Flag"},
     "geometry": {"type": "Point", "coordinates": [11.5, 47.2, 2100.0]}},
    {"type": "Feature", "properties": {"name": "Road"},
     "geometry": {"type": "LineString", "coordinates": [[11.0, 47.0], [11.1, 47.1]]}},
    {"type": "Feature", "properties": {"name": "Hike"},
     "geometry": {"type": "MultiLineString", "coordinates": [[[1, 1], [2, 2]], [[3, 3], [4, 4]]]}},
    {"type": "Feature", "properties": null,
     "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}
  ]
}"#;
        let geojson: GeoJson = json.parse().unwrap();
        let gpx = from_geojson(&geojson, "importer").unwrap();
        assert_eq!(gpx.creator, "importer");
        assert_eq!(gpx.waypoints.len(), 1);
        assert_eq!(gpx.waypoints[0].name.as_deref(), Some("Summit"));
        assert_eq!(gpx.waypoints[0].sym.as_deref(), Some("Flag"));
        assert_eq!(gpx.waypoints[0].elevation(), Some(2100.0));
        assert_eq!(gpx.routes[0].name.as_deref(), Some("Road"));
        assert_eq!(gpx.tracks[0].segments.len(), 2);
    }

    #[test]
    fn test_from_geojson_rejects_lone_polygon() {
        let json = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#;
        let geojson: GeoJson = json.parse().unwrap();
        let err = from_geojson(&geojson, "importer").unwrap_err();
        assert!(matches!(err, GpxError::UnsupportedGeometry(ref kind) if kind == "Polygon"));
    }

    #[test]
    fn test_from_geojson_checks_ranges() {
        let json = r#"{"type": "Point", "coordinates": [10.0, 95.0]}"#;
        let geojson: GeoJson = json.parse().unwrap();
        assert!(from_geojson(&geojson, "importer").is_err());
    }
}
