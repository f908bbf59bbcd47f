//! Site content documents.

use serde::Serialize;
use serde_json::{Value, json};

/// Content of the about page, stored as `configuration/about`.
#[derive(Debug, Clone, Serialize)]
pub struct AboutContent {
    pub title: String,
    pub body: String,
    pub contact_email: String,
}

impl Default for AboutContent {
    fn default() -> Self {
        Self {
            title: "About Librería".to_owned(),
            body: "An independent online bookstore.".to_owned(),
            contact_email: String::new(),
        }
    }
}

impl AboutContent {
    /// Document payload for an about-page save.
    #[must_use]
    pub fn to_fields(&self) -> Value {
        json!({
            "title": self.title,
            "body": self.body,
            "contact_email": self.contact_email,
        })
    }
}
