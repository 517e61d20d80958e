use chrono::{DateTime, FixedOffset};

use crate::extensions::Extensions;
use crate::marshal::gpx_model;
use crate::models::{Bounds, Copyright, Link, Person};

gpx_model! {
    /// Information about the GPX file, author, and copyright restrictions.
    #[derive(Default)]
    pub struct Metadata as "metadata" {
        pub name: Option<String> = "name",
        pub desc: Option<String> = "desc",
        pub author: Option<Person> = "author",
        pub copyright: Option<Copyright> = "copyright",
        pub links: Vec<Link> = "link",
        pub time: Option<DateTime<FixedOffset>> = "time",
        pub keywords: Option<String> = "keywords",
        pub bounds: Option<Bounds> = "bounds",
        pub extensions: Option<Extensions> = "extensions",
    }
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }
}
