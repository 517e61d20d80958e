use std::fmt;

use crate::marshal::gpx_model;

gpx_model! {
    /// An email address, split into id and domain to deter harvesting.
    pub struct Email as "email" {
        pub id: String = "id",
        pub domain: String = "domain",
    }
}

impl Email {
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
        }
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.domain)
    }
}
