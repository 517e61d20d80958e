//! Distance, duration, speed and elevation figures for point sequences.

use chrono::{DateTime, FixedOffset, TimeDelta};

use crate::error::{GpxError, Result};
use crate::models::{Bounds, Route, Track, TrackSegment, Waypoint};

/// Equatorial radius of the WGS84 ellipsoid, used as a sphere radius.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Pairs slower than 0.5 km/h count as standing still.
pub const MOVING_SPEED_THRESHOLD: f64 = 0.5 / 3.6;

fn seconds(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

impl Waypoint {
    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Waypoint) -> f64 {
        let (lat1, lon1) = (self.lat.value().to_radians(), self.lon.value().to_radians());
        let (lat2, lon2) = (other.lat.value().to_radians(), other.lon.value().to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Time from this point to `other`; zero when either is untimed.
    pub fn duration_to(&self, other: &Waypoint) -> TimeDelta {
        match (&self.time, &other.time) {
            (Some(a), Some(b)) => *b - *a,
            _ => TimeDelta::zero(),
        }
    }

    /// Meters per second; zero when no time elapsed.
    pub fn speed_to(&self, other: &Waypoint) -> f64 {
        let secs = seconds(self.duration_to(other));
        if secs > 0.0 {
            self.distance_to(other) / secs
        } else {
            0.0
        }
    }

    /// Elevation change in meters; zero when either elevation is missing.
    pub fn gain_to(&self, other: &Waypoint) -> f64 {
        match (self.elevation(), other.elevation()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        }
    }

    /// Grade in percent.
    pub fn slope_to(&self, other: &Waypoint) -> f64 {
        let distance = self.distance_to(other);
        if distance == 0.0 {
            0.0
        } else {
            self.gain_to(other) / distance * 100.0
        }
    }
}

/// Aggregates over one or more continuous runs of points.
///
/// Distances and durations are summed per run, so the gap between two
/// track segments never counts as travel.
pub trait PathStatistics {
    fn spans(&self) -> Vec<&[Waypoint]>;

    fn bounds(&self) -> Option<Bounds> {
        let mut points = self.spans().into_iter().flatten();
        let first = points.next()?;
        let (mut minlat, mut maxlat) = (&first.lat, &first.lat);
        let (mut minlon, mut maxlon) = (&first.lon, &first.lon);
        for p in points {
            if p.lat < *minlat {
                minlat = &p.lat;
            }
            if p.lat > *maxlat {
                maxlat = &p.lat;
            }
            if p.lon < *minlon {
                minlon = &p.lon;
            }
            if p.lon > *maxlon {
                maxlon = &p.lon;
            }
        }
        Some(Bounds::new(
            minlat.clone(),
            minlon.clone(),
            maxlat.clone(),
            maxlon.clone(),
        ))
    }

    /// Meters.
    fn total_distance(&self) -> f64 {
        self.spans()
            .iter()
            .flat_map(|span| span.windows(2))
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }

    /// First to last point of every run.
    fn total_duration(&self) -> TimeDelta {
        self.spans()
            .iter()
            .filter_map(|span| Some(span.first()?.duration_to(span.last()?)))
            .fold(TimeDelta::zero(), |acc, d| acc + d)
    }

    /// Time spent between pairs faster than [`MOVING_SPEED_THRESHOLD`].
    fn moving_duration(&self) -> TimeDelta {
        self.spans()
            .iter()
            .flat_map(|span| span.windows(2))
            .filter(|pair| pair[0].speed_to(&pair[1]) > MOVING_SPEED_THRESHOLD)
            .map(|pair| pair[0].duration_to(&pair[1]))
            .fold(TimeDelta::zero(), |acc, d| acc + d)
    }

    /// Meters per second over the whole duration; zero if no time elapsed.
    fn avg_speed(&self) -> f64 {
        let secs = seconds(self.total_duration());
        if secs > 0.0 {
            self.total_distance() / secs
        } else {
            0.0
        }
    }

    /// Total distance over the time spent moving; zero if never moving.
    fn avg_moving_speed(&self) -> f64 {
        let secs = seconds(self.moving_duration());
        if secs > 0.0 {
            self.total_distance() / secs
        } else {
            0.0
        }
    }

    /// Speed between consecutive timed points, stamped with the later time.
    fn speed_profile(&self) -> Vec<(DateTime<FixedOffset>, f64)> {
        self.spans()
            .iter()
            .flat_map(|span| span.windows(2))
            .filter_map(|pair| {
                pair[0].time?;
                let time = pair[1].time?;
                Some((time, pair[0].speed_to(&pair[1])))
            })
            .collect()
    }

    fn max_speed(&self) -> Result<f64> {
        speeds(&self.spans())
            .reduce(f64::max)
            .ok_or(GpxError::NoData("speed"))
    }

    fn min_speed(&self) -> Result<f64> {
        speeds(&self.spans())
            .reduce(f64::min)
            .ok_or(GpxError::NoData("speed"))
    }

    fn elevations(&self) -> Vec<f64> {
        self.spans()
            .into_iter()
            .flatten()
            .filter_map(Waypoint::elevation)
            .collect()
    }

    fn avg_elevation(&self) -> Result<f64> {
        let eles = self.elevations();
        if eles.is_empty() {
            return Err(GpxError::NoData("elevation"));
        }
        Ok(eles.iter().sum::<f64>() / eles.len() as f64)
    }

    fn max_elevation(&self) -> Result<f64> {
        self.elevations()
            .into_iter()
            .reduce(f64::max)
            .ok_or(GpxError::NoData("elevation"))
    }

    fn min_elevation(&self) -> Result<f64> {
        self.elevations()
            .into_iter()
            .reduce(f64::min)
            .ok_or(GpxError::NoData("elevation"))
    }

    fn diff_elevation(&self) -> Result<f64> {
        Ok(self.max_elevation()? - self.min_elevation()?)
    }

    /// Sum of climbs between consecutive points that carry elevation.
    fn total_ascent(&self) -> f64 {
        gains(&self.spans()).filter(|g| *g > 0.0).sum()
    }

    /// Sum of drops, as a positive number.
    fn total_descent(&self) -> f64 {
        -gains(&self.spans()).filter(|g| *g < 0.0).sum::<f64>()
    }

    /// `(cumulative distance in meters, elevation)` for each point with elevation.
    fn elevation_profile(&self) -> Vec<(f64, f64)> {
        let mut profile = Vec::new();
        let mut distance = 0.0;
        for span in self.spans() {
            let mut previous: Option<&Waypoint> = None;
            for point in span {
                if let Some(prev) = previous {
                    distance += prev.distance_to(point);
                }
                if let Some(ele) = point.elevation() {
                    profile.push((distance, ele));
                }
                previous = Some(point);
            }
        }
        profile
    }
}

fn speeds<'a>(spans: &'a [&'a [Waypoint]]) -> impl Iterator<Item = f64> + 'a {
    spans
        .iter()
        .flat_map(|span| span.windows(2))
        .map(|pair| pair[0].speed_to(&pair[1]))
}

fn gains<'a>(spans: &'a [&'a [Waypoint]]) -> impl Iterator<Item = f64> + 'a {
    spans.iter().flat_map(|span| {
        let eles: Vec<f64> = span.iter().filter_map(Waypoint::elevation).collect();
        eles.windows(2).map(|w| w[1] - w[0]).collect::<Vec<_>>()
    })
}

impl PathStatistics for TrackSegment {
    fn spans(&self) -> Vec<&[Waypoint]> {
        vec![&self.points]
    }
}

impl PathStatistics for Route {
    fn spans(&self) -> Vec<&[Waypoint]> {
        vec![&self.points]
    }
}

impl PathStatistics for Track {
    fn spans(&self) -> Vec<&[Waypoint]> {
        self.segments.iter().map(|s| s.points.as_slice()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::parse_datetime;

    fn point(lat: f64, lon: f64, ele: Option<f64>, time: Option<&str>) -> Waypoint {
        let mut p = Waypoint::from_coords(lat, lon, ele).unwrap();
        p.time = time.map(|t| parse_datetime(t).unwrap());
        p
    }

    fn segment() -> TrackSegment {
        TrackSegment {
            points: vec![
                point(52.5200, 13.4050, Some(34.0), Some("2024-01-15T10:00:00Z")),
                point(52.5210, 13.4060, Some(36.0), Some("2024-01-15T10:01:00Z")),
                point(52.5220, 13.4070, Some(38.0), Some("2024-01-15T10:02:00Z")),
                point(52.5230, 13.4080, Some(35.0), Some("2024-01-15T10:03:00Z")),
            ],
            extensions: None,
        }
    }

    #[test]
    fn test_distance_is_haversine() {
        let a = point(0.0, 0.0, None, None);
        let b = point(0.0, 1.0, None, None);
        let expected = EARTH_RADIUS * 1f64.to_radians();
        assert!((a.distance_to(&b) - expected).abs() < 1e-6);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_pairwise_helpers() {
        let seg = segment();
        let (a, b) = (&seg.points[0], &seg.points[1]);
        assert_eq!(a.duration_to(b), TimeDelta::seconds(60));
        assert!((a.speed_to(b) - a.distance_to(b) / 60.0).abs() < 1e-9);
        assert_eq!(a.gain_to(b), 2.0);
        assert!(a.slope_to(b) > 0.0);

        let untimed = point(52.5, 13.4, None, None);
        assert_eq!(untimed.duration_to(a), TimeDelta::zero());
        assert_eq!(untimed.speed_to(a), 0.0);
        assert_eq!(untimed.gain_to(a), 0.0);
    }

    #[test]
    fn test_segment_elevation() {
        let seg = segment();
        assert_eq!(seg.avg_elevation().unwrap(), 35.75);
        assert_eq!(seg.max_elevation().unwrap(), 38.0);
        assert_eq!(seg.min_elevation().unwrap(), 34.0);
        assert_eq!(seg.diff_elevation().unwrap(), 4.0);
        assert_eq!(seg.total_ascent(), 4.0);
        assert_eq!(seg.total_descent(), 3.0);

        let profile = seg.elevation_profile();
        assert_eq!(profile.len(), 4);
        assert_eq!(profile[0], (0.0, 34.0));
        assert!(profile[3].0 > profile[2].0);
    }

    #[test]
    fn test_no_elevation_fails_loudly() {
        let seg = TrackSegment {
            points: vec![point(1.0, 1.0, None, None), point(2.0, 2.0, None, None)],
            extensions: None,
        };
        assert!(matches!(seg.avg_elevation(), Err(GpxError::NoData("elevation"))));
        assert!(seg.max_elevation().is_err());
        assert_eq!(seg.total_ascent(), 0.0);
    }

    #[test]
    fn test_segment_speed() {
        let seg = segment();
        assert_eq!(seg.total_duration(), TimeDelta::seconds(180));
        assert_eq!(seg.moving_duration(), TimeDelta::seconds(180));
        let avg = seg.avg_speed();
        assert!((avg - seg.total_distance() / 180.0).abs() < 1e-9);
        assert!(seg.max_speed().unwrap() >= seg.min_speed().unwrap());
        assert_eq!(seg.speed_profile().len(), 3);
    }

    #[test]
    fn test_avg_moving_speed_counts_all_distance() {
        // 100 m in one minute, then a 1 m shuffle over ten minutes.
        let seg = TrackSegment {
            points: vec![
                point(0.0, 0.0, None, Some("2024-01-15T10:00:00Z")),
                point(0.0, 0.000898, None, Some("2024-01-15T10:01:00Z")),
                point(0.0, 0.000907, None, Some("2024-01-15T10:11:00Z")),
            ],
            extensions: None,
        };
        assert_eq!(seg.moving_duration(), TimeDelta::seconds(60));
        let expected = seg.total_distance() / 60.0;
        assert!((seg.avg_moving_speed() - expected).abs() < 1e-9);
        assert!(seg.avg_moving_speed() > seg.points[0].speed_to(&seg.points[1]));
    }

    #[test]
    fn test_zero_duration_speed_is_zero() {
        let seg = TrackSegment {
            points: vec![point(1.0, 1.0, None, None), point(1.001, 1.0, None, None)],
            extensions: None,
        };
        assert_eq!(seg.avg_speed(), 0.0);
        assert_eq!(seg.avg_moving_speed(), 0.0);
        assert!(seg.speed_profile().is_empty());

        let empty = TrackSegment::default();
        assert!(matches!(empty.max_speed(), Err(GpxError::NoData("speed"))));
        assert!(empty.bounds().is_none());
    }

    #[test]
    fn test_multi_segment_track() {
        let first = TrackSegment {
            points: vec![
                point(52.0, 13.0, None, Some("2024-01-15T10:00:00Z")),
                point(52.0009, 13.0, None, Some("2024-01-15T10:01:00Z")),
            ],
            extensions: None,
        };
        let second = TrackSegment {
            points: vec![
                point(53.0, 14.0, None, Some("2024-01-15T11:00:00Z")),
                point(53.0009, 14.0, None, Some("2024-01-15T11:02:00Z")),
            ],
            extensions: None,
        };
        let expected = first.total_distance() + second.total_distance();
        assert!((first.total_distance() - 100.0).abs() < 1.0);
        let track = Track {
            segments: vec![first, second],
            ..Default::default()
        };
        assert!((track.total_distance() - expected).abs() < 1e-9);
        assert_eq!(track.total_duration(), TimeDelta::seconds(180));
    }

    #[test]
    fn test_bounds_keep_source_digits() {
        let seg = segment();
        let bounds = seg.bounds().unwrap();
        assert_eq!(bounds.minlat.to_string(), "52.52");
        assert_eq!(bounds.maxlon.value(), 13.408);
    }
}
