mod api;
mod bootstrap;
mod config;
pub mod constants;
mod document;
pub mod error;
mod event;
mod hooks;
mod links;
mod payload;
mod proxy;
mod touchpoint;
mod utm;
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
mod wasm;

pub use api::Observer;
pub use bootstrap::{load_proxy_script, proxy_script_url, ProxyScript};
pub use config::ObserverConfig;
pub use document::{MemoryDocument, PageDocument};
pub use event::{
    event_data_from_loose, EventData, EventRecord, EventTag, MetricKind, Purchase, Transaction,
};
pub use hooks::SyncHooks;
pub use links::{rewrite_outbound_links, with_visitor_sync};
pub use payload::{TrackPayload, UtmData};
pub use proxy::{ObserverProxy, RecordingProxy, VisitorIdCallback};
pub use touchpoint::Touchpoint;
pub use utm::parse_utm_params;
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub use wasm::{
    init_leo_observer, install, leo_observer_proxy_ready, record_event_accept_tracking,
    record_event_add_to_cart, record_event_content_view, record_event_item_view,
    record_event_like, record_event_page_view, record_event_purchase, record_event_search,
    record_event_share, record_event_short_link_click, record_event_submit_contact,
    record_leo_event, JsObserverProxy, WebDocument,
};
