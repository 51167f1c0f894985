//! Proxy script bootstrap: builds the CDN URL and schedules the script load.

use crate::observer::config::ObserverConfig;
use crate::observer::constants::PROXY_SCRIPT_PATH;
use crate::observer::document::PageDocument;
use crate::observer::error::ObserverResult;

/// A `<script>` reference as inserted into the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyScript {
    pub src: String,
    pub async_load: bool,
    pub defer: bool,
}

impl ProxyScript {
    /// Async + deferred script reference to `src`.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            async_load: true,
            defer: true,
        }
    }
}

/// `<protocol>//<cdn-domain>/js/leo-observer/leo.proxy.min.js`
pub fn proxy_script_url(config: &ObserverConfig) -> String {
    format!(
        "{}//{}{}",
        config.protocol(),
        config.cdn_domain.trim().trim_end_matches('/'),
        PROXY_SCRIPT_PATH
    )
}

/// Inserts the proxy script before the first script node of `document`.
///
/// The load itself is asynchronous; the proxy announces itself through the readiness callback once
/// it has executed. Fails with `observer/invalid-config` when the configuration does not validate
/// and with `observer/missing-script-node` when the page has no script node.
pub fn load_proxy_script(
    document: &dyn PageDocument,
    config: &ObserverConfig,
) -> ObserverResult<ProxyScript> {
    config.validate()?;
    let script = ProxyScript::new(proxy_script_url(config));
    document.insert_script_before_first(&script)?;
    log::debug!("Scheduled observer proxy load from {}", script.src);
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::document::MemoryDocument;

    fn config() -> ObserverConfig {
        ObserverConfig::new("obs-1", "log.example.com", "cdn.example.com")
    }

    #[test]
    fn url_uses_protocol_domain_and_fixed_path() {
        assert_eq!(
            proxy_script_url(&config()),
            "https://cdn.example.com/js/leo-observer/leo.proxy.min.js"
        );
        assert_eq!(
            proxy_script_url(&config().with_protocol("http:")),
            "http://cdn.example.com/js/leo-observer/leo.proxy.min.js"
        );
    }

    #[test]
    fn inserts_async_deferred_script_before_first_script() {
        let doc = MemoryDocument::new("https://mysite.com/", "Home").with_script("/app.js");
        let script = load_proxy_script(&doc, &config()).unwrap();
        assert!(script.async_load);
        assert!(script.defer);

        let scripts = doc.scripts();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0], script);
        assert_eq!(scripts[1].src, "/app.js");
    }

    #[test]
    fn fails_without_existing_script_node() {
        let doc = MemoryDocument::new("https://mysite.com/", "Home");
        let err = load_proxy_script(&doc, &config()).unwrap_err();
        assert_eq!(err.code_str(), "observer/missing-script-node");
    }

    #[test]
    fn rejects_unconfigured_cdn_domain() {
        let doc = MemoryDocument::new("https://mysite.com/", "Home").with_script("/app.js");
        let err = load_proxy_script(&doc, &ObserverConfig::default()).unwrap_err();
        assert_eq!(err.code_str(), "observer/invalid-config");
        assert_eq!(doc.script_count(), 1);
    }

    #[test]
    fn rejects_protocol_without_colon() {
        let doc = MemoryDocument::new("https://mysite.com/", "Home").with_script("/app.js");
        let err = load_proxy_script(&doc, &config().with_protocol("https")).unwrap_err();
        assert_eq!(err.code_str(), "observer/invalid-config");
        assert_eq!(doc.scripts().len(), 1);
        assert_eq!(doc.scripts()[0].src, "/app.js");
    }
}
