//! The slice of the page DOM the observer reads and mutates.

use std::sync::Mutex;

use url::Url;

use crate::observer::bootstrap::ProxyScript;
use crate::observer::error::{invalid_argument, missing_script_node, ObserverResult};

/// Page operations needed by the bootstrap loader, the touchpoint capture and link rewriting.
///
/// Anchors are addressed by their position in document order. `anchor_hrefs` returns resolved
/// (absolute) hrefs the way `HTMLAnchorElement.href` does.
pub trait PageDocument {
    fn title(&self) -> String;

    fn url(&self) -> String;

    /// `location.host` of the page, including a non-default port.
    fn host(&self) -> String;

    fn script_count(&self) -> usize;

    /// Inserts `script` as a sibling before the first `<script>` node.
    fn insert_script_before_first(&self, script: &ProxyScript) -> ObserverResult<()>;

    fn anchor_hrefs(&self) -> Vec<String>;

    fn set_anchor_href(&self, index: usize, href: &str) -> ObserverResult<()>;
}

#[derive(Clone, Debug, Default)]
struct MemoryDocumentState {
    scripts: Vec<ProxyScript>,
    anchors: Vec<String>,
}

/// In-memory page used off the browser (server-side rendering, tests).
#[derive(Debug)]
pub struct MemoryDocument {
    title: String,
    url: Url,
    state: Mutex<MemoryDocumentState>,
}

impl MemoryDocument {
    /// Creates an empty page at `url`. Unparseable URLs fall back to `about:blank`.
    pub fn new(url: &str, title: impl Into<String>) -> Self {
        let url = Url::parse(url).unwrap_or_else(|err| {
            log::warn!("Invalid page URL `{url}` ({err}); using about:blank");
            Url::parse("about:blank").expect("about:blank is a valid URL")
        });
        Self {
            title: title.into(),
            url,
            state: Mutex::new(MemoryDocumentState::default()),
        }
    }

    /// Adds an existing `<script>` node with the given `src`.
    pub fn with_script(self, src: impl Into<String>) -> Self {
        self.state.lock().unwrap().scripts.push(ProxyScript {
            src: src.into(),
            async_load: false,
            defer: false,
        });
        self
    }

    /// Adds an anchor. Relative hrefs are resolved against the page URL.
    pub fn with_anchor(self, href: &str) -> Self {
        let resolved = self.resolve(href);
        self.state.lock().unwrap().anchors.push(resolved);
        self
    }

    /// Scripts in document order.
    pub fn scripts(&self) -> Vec<ProxyScript> {
        self.state.lock().unwrap().scripts.clone()
    }

    fn resolve(&self, href: &str) -> String {
        match self.url.join(href) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => href.to_string(),
        }
    }
}

impl PageDocument for MemoryDocument {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn url(&self) -> String {
        self.url.to_string()
    }

    fn host(&self) -> String {
        match (self.url.host_str(), self.url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        }
    }

    fn script_count(&self) -> usize {
        self.state.lock().unwrap().scripts.len()
    }

    fn insert_script_before_first(&self, script: &ProxyScript) -> ObserverResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.scripts.is_empty() {
            return Err(missing_script_node(
                "document has no <script> element to insert the proxy script before",
            ));
        }
        state.scripts.insert(0, script.clone());
        Ok(())
    }

    fn anchor_hrefs(&self) -> Vec<String> {
        self.state.lock().unwrap().anchors.clone()
    }

    fn set_anchor_href(&self, index: usize, href: &str) -> ObserverResult<()> {
        let resolved = self.resolve(href);
        let mut state = self.state.lock().unwrap();
        match state.anchors.get_mut(index) {
            Some(slot) => {
                *slot = resolved;
                Ok(())
            }
            None => Err(invalid_argument(format!(
                "anchor index {index} out of range"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_includes_non_default_port() {
        let doc = MemoryDocument::new("http://localhost:8080/shop", "Shop");
        assert_eq!(doc.host(), "localhost:8080");
        let doc = MemoryDocument::new("https://mysite.com/", "Home");
        assert_eq!(doc.host(), "mysite.com");
    }

    #[test]
    fn relative_anchors_are_resolved() {
        let doc = MemoryDocument::new("https://mysite.com/blog/post", "Post")
            .with_anchor("../about")
            .with_anchor("https://external.com/page");
        assert_eq!(
            doc.anchor_hrefs(),
            vec![
                "https://mysite.com/about".to_string(),
                "https://external.com/page".to_string()
            ]
        );
    }

    #[test]
    fn insertion_requires_existing_script() {
        let doc = MemoryDocument::new("https://mysite.com/", "Home");
        let script = ProxyScript::new("https://cdn.example.com/x.js");
        let err = doc.insert_script_before_first(&script).unwrap_err();
        assert_eq!(err.code_str(), "observer/missing-script-node");
        assert_eq!(doc.script_count(), 0);
    }
}
