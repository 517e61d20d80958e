use crate::extensions::Extensions;
use crate::marshal::gpx_model;
use crate::models::{Link, TrackSegment, Waypoint};

gpx_model! {
    /// An ordered list of track segments describing a path.
    #[derive(Default)]
    pub struct Track as "trk" {
        pub name: Option<String> = "name",
        pub cmt: Option<String> = "cmt",
        pub desc: Option<String> = "desc",
        pub src: Option<String> = "src",
        pub links: Vec<Link> = "link",
        /// GPS track number.
        pub number: Option<u32> = "number",
        pub kind: Option<String> = "type",
        pub extensions: Option<Extensions> = "extensions",
        pub segments: Vec<TrackSegment> = "trkseg",
    }
}

impl Track {
    /// All track points across segments, in order.
    pub fn points(&self) -> impl Iterator<Item = &Waypoint> {
        self.segments.iter().flat_map(|s| s.points.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::Model;
    use crate::xml::Element;

    #[test]
    fn test_empty_lists_parse_empty() {
        let xml = r#"<trk xmlns="http://www.topografix.com/GPX/1/1"><trkseg/></trk>"#;
        let track = Track::from_xml(&Element::parse(xml).unwrap()).unwrap();
        assert_eq!(track.segments.len(), 1);
        assert!(track.segments[0].points.is_empty());

        let xml = r#"<trk xmlns="http://www.topografix.com/GPX/1/1"><name>t</name></trk>"#;
        let track = Track::from_xml(&Element::parse(xml).unwrap()).unwrap();
        assert!(track.segments.is_empty());
        assert_eq!(track.to_xml().child_elements().count(), 1);
    }

    #[test]
    fn test_points_across_segments() {
        let xml = r#"<trk xmlns="http://www.topografix.com/GPX/1/1">
  <trkseg><trkpt lat="1" lon="1"/><trkpt lat="2" lon="2"/></trkseg>
  <trkseg><trkpt lat="3" lon="3"/></trkseg>
</trk>"#;
        let track = Track::from_xml(&Element::parse(xml).unwrap()).unwrap();
        assert_eq!(track.points().count(), 3);
        let built = track.to_xml();
        let seg = built.find_child(built.namespace(), "trkseg").unwrap();
        assert_eq!(seg.child_elements().next().unwrap().name(), "trkpt");
    }
}
