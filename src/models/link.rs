use crate::marshal::gpx_model;

gpx_model! {
    /// A link to an external resource (web page, photo, video clip, ...)
    /// with additional information.
    pub struct Link as "link" {
        pub href: String = "href",
        pub text: Option<String> = "text",
        /// MIME type of the content, e.g. `image/jpeg`.
        pub kind: Option<String> = "type",
    }
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: None,
            kind: None,
        }
    }
}
