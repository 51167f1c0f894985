use serde::Serialize;

use crate::observer::document::PageDocument;

/// Title and URL of the page events originate from, captured once per observer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Touchpoint {
    pub title: String,
    pub url: String,
}

impl Touchpoint {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    pub fn capture(document: &dyn PageDocument) -> Self {
        Self::new(document.title(), document.url())
    }

    /// Host part of the touchpoint URL, empty when the URL has none.
    pub fn host(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}
