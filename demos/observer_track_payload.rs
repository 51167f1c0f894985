//! Builds the tracking document the CDP endpoint ingests for the current page.

use std::sync::Arc;

use leo_observer::observer::{MemoryDocument, Observer, ObserverConfig, RecordingProxy};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ObserverConfig::new("demo-observer", "log.example.com", "cdn.example.com")
        .with_tenant_id("PNJ");
    let page = Arc::new(MemoryDocument::new(
        "https://www.pnj.com.vn/?utm_source=google&utm_campaign=flash_deal",
        "PNJ",
    ));
    let observer = Observer::new(
        config,
        Arc::new(RecordingProxy::with_visitor_id("8f14e45f-ceea-467f-a5f6-0b5d9e3c2a11")),
        page,
    );

    let visitor_id = observer.visitor_id().await?;
    let payload = observer.track_payload(
        "identify",
        &visitor_id,
        json!({"loyalty_level": "gold"}).as_object().cloned(),
    )?;
    println!("{}", payload.to_json()?);

    Ok(())
}
