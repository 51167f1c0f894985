//! Drives the observer against an in-memory page and proxy and prints what the proxy received.

use std::sync::Arc;

use leo_observer::observer::{
    MemoryDocument, Observer, ObserverConfig, PageDocument, Purchase, RecordingProxy, SyncHooks,
};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ObserverConfig::from_environment().unwrap_or_else(|| {
        ObserverConfig::new("demo-observer", "log.example.com", "cdn.example.com")
    });

    let page = Arc::new(
        MemoryDocument::new("https://mysite.com/rings?utm_source=facebook", "Rings")
            .with_script("/theme.js")
            .with_anchor("https://partner.example.org/offer")
            .with_anchor("/cart"),
    );
    let proxy = Arc::new(RecordingProxy::with_visitor_id("demo-visitor"));
    let observer = Observer::new(config, proxy.clone(), page.clone());
    observer.set_sync_hooks(
        SyncHooks::new().on_ga4_sync(|visitor_id| println!("GA4 sync for {visitor_id}")),
    );

    let script = observer.load_proxy_script()?;
    println!("Proxy script: {}", script.src);

    observer.on_proxy_ready()?;
    observer.record_like(json!({"item": "R-01"}).as_object().cloned())?;
    observer.record_purchase(
        Purchase::default()
            .with_items(vec![json!({"sku": "R-01", "quantity": 1})])
            .with_transaction("T-1", 99.0),
    )?;

    for event in proxy.recorded_events() {
        println!("Recorded event: {}", serde_json::to_string(&event)?);
    }
    for href in page.anchor_hrefs() {
        println!("Link: {href}");
    }

    Ok(())
}
