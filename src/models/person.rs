use crate::marshal::gpx_model;
use crate::models::{Email, Link};

gpx_model! {
    /// A person or organization.
    #[derive(Default)]
    pub struct Person as "author" {
        pub name: Option<String> = "name",
        pub email: Option<Email> = "email",
        pub link: Option<Link> = "link",
    }
}
