use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub title: String,
}

/// A page as it occurs in the dump.
///
/// `canonical_title` is empty until a worker assigns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: String,
    #[serde(rename = "ctitle")]
    pub canonical_title: String,
    pub redirect: Redirect,
    pub text: String,
}

impl Page {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_redirect(&self) -> bool {
        !self.redirect.title.is_empty()
    }
}

/// A Wikidata page whose text has been decoded into structured content.
#[derive(Serialize)]
pub struct WikidataPage<'a> {
    pub title: &'a str,
    #[serde(rename = "ctitle")]
    pub canonical_title: &'a str,
    pub redirect: &'a Redirect,
    pub content: Value,
}
