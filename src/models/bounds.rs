use crate::marshal::gpx_model;
use crate::types::{Latitude, Longitude};

gpx_model! {
    /// Two lat/lon pairs defining the extent of an element.
    ///
    /// The corners are not checked for ordering; a box may be inverted,
    /// for instance to describe an area crossing the antimeridian.
    pub struct Bounds as "bounds" {
        pub minlat: Latitude = "minlat",
        pub minlon: Longitude = "minlon",
        pub maxlat: Latitude = "maxlat",
        pub maxlon: Longitude = "maxlon",
    }
}

impl Bounds {
    pub fn new(minlat: Latitude, minlon: Longitude, maxlat: Latitude, maxlon: Longitude) -> Self {
        Self {
            minlat,
            minlon,
            maxlat,
            maxlon,
        }
    }

    /// `(minlat, minlon, maxlat, maxlon)`
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (
            self.minlat.value(),
            self.minlon.value(),
            self.maxlat.value(),
            self.maxlon.value(),
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let (minlat, minlon, maxlat, maxlon) = self.as_tuple();
        (minlat..=maxlat).contains(&lat) && (minlon..=maxlon).contains(&lon)
    }
}
