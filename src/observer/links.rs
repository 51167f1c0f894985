//! Outbound link decoration with the visitor-sync parameter.

use crate::observer::constants::VISITOR_SYNC_PARAM;
use crate::observer::document::PageDocument;

/// Returns `href` with `leosyn=<visitor_id>` appended when it points away from `page_host`.
///
/// An href counts as outbound when it contains `http` and does not contain the page host. An
/// empty host is contained in every href, so pages without one (`file:`, `about:blank`) leave all
/// links untouched. The visitor ID is appended verbatim. Returns `None` for links that stay
/// untouched.
pub fn with_visitor_sync(href: &str, page_host: &str, visitor_id: &str) -> Option<String> {
    if !href.contains("http") || href.contains(page_host) {
        return None;
    }
    let separator = if href.contains('?') { '&' } else { '?' };
    Some(format!("{href}{separator}{VISITOR_SYNC_PARAM}={visitor_id}"))
}

/// Rewrites every outbound anchor of `document` in place and returns how many were changed.
pub fn rewrite_outbound_links(document: &dyn PageDocument, visitor_id: &str) -> usize {
    let host = document.host();
    let mut rewritten = 0;
    for (index, href) in document.anchor_hrefs().iter().enumerate() {
        let Some(updated) = with_visitor_sync(href, &host, visitor_id) else {
            continue;
        };
        match document.set_anchor_href(index, &updated) {
            Ok(()) => rewritten += 1,
            Err(err) => log::warn!("Failed to rewrite anchor {index}: {err}"),
        }
    }
    log::debug!("Attached visitor sync parameter to {rewritten} outbound links");
    rewritten
}
