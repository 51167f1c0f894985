//! Rust bindings for the LEO CDP web observer.
//!
//! The [`observer`] module loads the externally hosted observer proxy script, exposes the fixed
//! catalogue of event-reporting functions and forwards every call to the proxy's generic
//! view/action/conversion recorders. Once the proxy reports ready, the observer fires the automatic
//! page view and decorates outbound links with the visitor-sync parameter.
//!
//! Off the browser the same API runs against [`observer::MemoryDocument`] and
//! [`observer::RecordingProxy`]; enable the `wasm-web` feature to bind to the real DOM and the
//! `LeoObserverProxy` global.
//!
//! ```
//! use std::sync::Arc;
//! use leo_observer::observer::{MemoryDocument, Observer, ObserverConfig, RecordingProxy};
//!
//! let proxy = Arc::new(RecordingProxy::with_visitor_id("V123"));
//! let page = Arc::new(
//!     MemoryDocument::new("https://mysite.com/", "Home")
//!         .with_script("/app.js")
//!         .with_anchor("http://external.com/page"),
//! );
//! let observer = Observer::new(
//!     ObserverConfig::new("obs-1", "log.example.com", "cdn.example.com"),
//!     proxy.clone(),
//!     page.clone(),
//! );
//!
//! observer.load_proxy_script().unwrap();
//! observer.on_proxy_ready().unwrap();
//! observer.record_like(None).unwrap();
//!
//! assert_eq!(proxy.recorded_events().len(), 2);
//! ```

pub mod observer;
