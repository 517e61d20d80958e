use crate::extensions::Extensions;
use crate::marshal::gpx_model;
use crate::models::Waypoint;

gpx_model! {
    /// A run of track points that are logically connected in order.
    ///
    /// Starting a new segment marks a break in recording, for instance
    /// when the receiver lost its fix or was switched off.
    #[derive(Default)]
    pub struct TrackSegment as "trkseg" {
        pub points: Vec<Waypoint> = "trkpt",
        pub extensions: Option<Extensions> = "extensions",
    }
}
