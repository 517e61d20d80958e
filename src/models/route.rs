use crate::extensions::Extensions;
use crate::marshal::gpx_model;
use crate::models::{Link, Waypoint};

gpx_model! {
    /// An ordered list of route points leading to a destination.
    #[derive(Default)]
    pub struct Route as "rte" {
        pub name: Option<String> = "name",
        pub cmt: Option<String> = "cmt",
        pub desc: Option<String> = "desc",
        pub src: Option<String> = "src",
        pub links: Vec<Link> = "link",
        /// GPS route number.
        pub number: Option<u32> = "number",
        pub kind: Option<String> = "type",
        pub extensions: Option<Extensions> = "extensions",
        pub points: Vec<Waypoint> = "rtept",
    }
}
