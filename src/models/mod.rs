//! The GPX 1.1 record types.
//!
//! Field order in every declaration follows the `xsd:sequence` of the
//! corresponding GPX 1.1 schema type, so built documents are schema-ordered.

mod bounds;
mod copyright;
mod email;
mod gpx;
mod link;
mod metadata;
mod person;
mod route;
mod track;
mod track_segment;
mod waypoint;

pub use bounds::Bounds;
pub use copyright::Copyright;
pub use email::Email;
pub use gpx::{DEFAULT_CREATOR, GPX_VERSION, Gpx};
pub use link::Link;
pub use metadata::Metadata;
pub use person::Person;
pub use route::Route;
pub use track::Track;
pub use track_segment::TrackSegment;
pub use waypoint::Waypoint;
