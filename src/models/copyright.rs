use crate::marshal::gpx_model;

gpx_model! {
    /// Copyright holder and the license under which the data is released.
    pub struct Copyright as "copyright" {
        pub author: String = "author",
        pub year: Option<i32> = "year",
        /// Link to the license text.
        pub license: Option<String> = "license",
    }
}

impl Copyright {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            year: None,
            license: None,
        }
    }
}
