use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use serde_json::Value;

use crate::observer::bootstrap::{load_proxy_script, ProxyScript};
use crate::observer::config::ObserverConfig;
use crate::observer::document::PageDocument;
use crate::observer::error::{invalid_argument, proxy_unavailable, ObserverResult};
use crate::observer::event::{
    event_data_from_loose, EventData, EventTag, MetricKind, Purchase, Transaction,
};
use crate::observer::hooks::SyncHooks;
use crate::observer::links::rewrite_outbound_links;
use crate::observer::payload::TrackPayload;
use crate::observer::proxy::ObserverProxy;
use crate::observer::touchpoint::Touchpoint;

/// Event-forwarding facade over the observer proxy.
///
/// Each named `record_*` method defaults its event data to `{}`, forwards to exactly one of the
/// proxy's generic methods and returns the proxy's result unchanged. Nothing is queued or retried.
#[derive(Clone)]
pub struct Observer {
    inner: Arc<ObserverInner>,
}

struct ObserverInner {
    config: ObserverConfig,
    proxy: Arc<dyn ObserverProxy>,
    document: Arc<dyn PageDocument>,
    touchpoint: Touchpoint,
    hooks: Mutex<SyncHooks>,
    ready: AtomicBool,
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("observer_id", &self.inner.config.observer_id)
            .field("touchpoint", &self.inner.touchpoint)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Observer {
    /// Creates the facade and captures the page touchpoint.
    pub fn new(
        config: ObserverConfig,
        proxy: Arc<dyn ObserverProxy>,
        document: Arc<dyn PageDocument>,
    ) -> Self {
        let touchpoint = Touchpoint::capture(document.as_ref());
        let inner = ObserverInner {
            config,
            proxy,
            document,
            touchpoint,
            hooks: Mutex::new(SyncHooks::default()),
            ready: AtomicBool::new(false),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.inner.config
    }

    /// Title and URL of the page as seen when the observer was created.
    pub fn touchpoint(&self) -> &Touchpoint {
        &self.inner.touchpoint
    }

    /// Replaces the hooks notified after the visitor ID has been synchronised.
    pub fn set_sync_hooks(&self, hooks: SyncHooks) {
        *self.inner.hooks.lock().unwrap() = hooks;
    }

    /// Returns whether [`Observer::on_proxy_ready`] has run.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Inserts the proxy script into the page. See [`load_proxy_script`].
    pub fn load_proxy_script(&self) -> ObserverResult<ProxyScript> {
        load_proxy_script(self.inner.document.as_ref(), &self.inner.config)
    }

    /// Forwards `tag` to the proxy method matching its metric kind. Conversion tags are sent with
    /// a default transaction; use [`Observer::record_purchase`] to supply one.
    pub fn record_event(&self, tag: EventTag, data: Option<EventData>) -> ObserverResult<()> {
        let data = data.unwrap_or_default();
        log::debug!("Forwarding {} event `{tag}`", metric_label(tag.kind()));
        match tag.kind() {
            MetricKind::View => self.inner.proxy.record_view_event(tag, &data),
            MetricKind::Action => self.inner.proxy.record_action_event(tag, &data),
            MetricKind::Conversion => self.forward_conversion(tag, &data, Transaction::default()),
        }
    }

    /// Same as [`Observer::record_event`] for an untyped payload; non-objects become `{}`.
    pub fn record_event_loose(&self, tag: EventTag, data: Value) -> ObserverResult<()> {
        self.record_event(tag, Some(event_data_from_loose(data)))
    }

    pub fn record_page_view(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::PageView, data)
    }

    pub fn record_content_view(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::ContentView, data)
    }

    pub fn record_item_view(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::ItemView, data)
    }

    pub fn record_accept_tracking(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::AcceptTracking, data)
    }

    pub fn record_like(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::Like, data)
    }

    pub fn record_share(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::Share, data)
    }

    pub fn record_short_link_click(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::ShortLinkClick, data)
    }

    pub fn record_search(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::Search, data)
    }

    pub fn record_add_to_cart(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::AddToCart, data)
    }

    pub fn record_submit_contact(&self, data: Option<EventData>) -> ObserverResult<()> {
        self.record_event(EventTag::SubmitContact, data)
    }

    /// Records a purchase conversion. Missing fields default to `{}`, `[]`, `""`, `0` and `"USD"`.
    pub fn record_purchase(&self, purchase: Purchase) -> ObserverResult<()> {
        let (data, transaction) = purchase.into_parts();
        log::debug!(
            "Forwarding conversion event `purchase` (transaction `{}`)",
            transaction.transaction_id
        );
        self.forward_conversion(EventTag::Purchase, &data, transaction)
    }

    /// Called by the proxy once it has initialised.
    ///
    /// Fires one page view, then asks the proxy for the visitor ID. When the ID arrives every
    /// outbound anchor gets `leosyn=<id>` and the GA4-sync and chatbot-start hooks run in that
    /// order. Later calls are ignored.
    pub fn on_proxy_ready(&self) -> ObserverResult<()> {
        if self.inner.ready.swap(true, Ordering::SeqCst) {
            log::warn!("Observer proxy reported ready more than once; ignoring");
            return Ok(());
        }
        log::info!(
            "Observer proxy ready for `{}` on {}",
            self.inner.config.observer_id,
            self.inner.touchpoint.url
        );

        self.record_page_view(None)?;

        let document = self.inner.document.clone();
        let hooks = self.inner.hooks.lock().unwrap().clone();
        self.inner
            .proxy
            .synch_visitor_id(Box::new(move |visitor_id: String| {
                rewrite_outbound_links(document.as_ref(), &visitor_id);
                hooks.notify(&visitor_id);
            }))
    }

    /// Resolves the visitor ID through the proxy callback.
    pub async fn visitor_id(&self) -> ObserverResult<String> {
        let (sender, receiver) = oneshot::channel::<String>();
        self.inner.proxy.synch_visitor_id(Box::new(move |visitor_id| {
            let _ = sender.send(visitor_id);
        }))?;
        receiver
            .await
            .map_err(|_| proxy_unavailable("observer proxy dropped the visitor ID request"))
    }

    /// Builds the tracking document for `metric` as the backend ingests it, using the configured
    /// tenant and the page touchpoint.
    pub fn track_payload(
        &self,
        metric: &str,
        visitor_id: &str,
        data: Option<EventData>,
    ) -> ObserverResult<TrackPayload> {
        let tenant_id = self
            .inner
            .config
            .tenant_id
            .as_deref()
            .ok_or_else(|| invalid_argument("tenant_id must be configured to build track payloads"))?;
        let payload = TrackPayload::new(tenant_id, metric, visitor_id, &self.inner.touchpoint)
            .with_event_data(data.unwrap_or_default());
        payload.validate()?;
        Ok(payload)
    }

    fn forward_conversion(
        &self,
        tag: EventTag,
        data: &EventData,
        transaction: Transaction,
    ) -> ObserverResult<()> {
        self.inner.proxy.record_conversion_event(
            tag,
            data,
            &transaction.transaction_id,
            &transaction.shopping_cart_items,
            transaction.transaction_value,
            &transaction.currency_code,
        )
    }
}

fn metric_label(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::View => "view",
        MetricKind::Action => "action",
        MetricKind::Conversion => "conversion",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::document::MemoryDocument;
    use crate::observer::error::proxy_failure;
    use crate::observer::proxy::RecordingProxy;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config() -> ObserverConfig {
        ObserverConfig::new("obs-test", "log.example.com", "cdn.example.com").with_tenant_id("PNJ")
    }

    fn page() -> Arc<MemoryDocument> {
        Arc::new(
            MemoryDocument::new("https://mysite.com/shop?utm_source=zalo", "Shop")
                .with_script("/app.js")
                .with_anchor("/cart")
                .with_anchor("http://external.com/page")
                .with_anchor("http://external.com/page?a=1"),
        )
    }

    fn observer_with(proxy: Arc<RecordingProxy>, doc: Arc<MemoryDocument>) -> Observer {
        Observer::new(config(), proxy, doc)
    }

    #[test]
    fn every_named_function_defaults_to_empty_object() {
        let proxy = Arc::new(RecordingProxy::new());
        let observer = observer_with(proxy.clone(), page());

        observer.record_page_view(None).unwrap();
        observer.record_content_view(None).unwrap();
        observer.record_item_view(None).unwrap();
        observer.record_accept_tracking(None).unwrap();
        observer.record_like(None).unwrap();
        observer.record_share(None).unwrap();
        observer.record_short_link_click(None).unwrap();
        observer.record_search(None).unwrap();
        observer.record_add_to_cart(None).unwrap();
        observer.record_submit_contact(None).unwrap();
        observer.record_purchase(Purchase::default()).unwrap();

        let events = proxy.recorded_events();
        assert_eq!(events.len(), EventTag::ALL.len());
        for (event, tag) in events.iter().zip(EventTag::ALL) {
            assert_eq!(event.event_type, tag);
            assert_eq!(event.metric, tag.kind());
            assert!(event.event_data.is_empty());
        }
    }

    #[test]
    fn loose_payloads_that_are_not_objects_become_empty() {
        let proxy = Arc::new(RecordingProxy::new());
        let observer = observer_with(proxy.clone(), page());

        observer.record_event_loose(EventTag::Like, json!("oops")).unwrap();
        observer
            .record_event_loose(EventTag::Search, json!({"keywords": "ring"}))
            .unwrap();

        let events = proxy.recorded_events();
        assert!(events[0].event_data.is_empty());
        assert_eq!(events[1].event_data.get("keywords"), Some(&json!("ring")));
    }

    #[test]
    fn purchase_forwards_defaulted_transaction() {
        let proxy = Arc::new(RecordingProxy::new());
        let observer = observer_with(proxy.clone(), page());

        observer
            .record_purchase(Purchase::from_loose(
                json!(null),
                json!("items"),
                json!(7),
                json!("free"),
                json!(["VND"]),
            ))
            .unwrap();

        let events = proxy.recorded_events();
        let transaction = events[0].transaction.clone().unwrap();
        assert!(events[0].event_data.is_empty());
        assert_eq!(transaction, Transaction::default());
        assert_eq!(transaction.currency_code, "USD");
    }

    #[test]
    fn purchase_forwards_supplied_values() {
        let proxy = Arc::new(RecordingProxy::new());
        let observer = observer_with(proxy.clone(), page());

        observer
            .record_purchase(
                Purchase::default()
                    .with_items(vec![json!({"sku": "R-01"})])
                    .with_transaction("T-100", 59.9)
                    .with_currency("VND"),
            )
            .unwrap();

        let transaction = proxy.recorded_events()[0].transaction.clone().unwrap();
        assert_eq!(transaction.transaction_id, "T-100");
        assert_eq!(transaction.transaction_value, 59.9);
        assert_eq!(transaction.currency_code, "VND");
        assert_eq!(transaction.shopping_cart_items, vec![json!({"sku": "R-01"})]);
    }

    #[test]
    fn proxy_errors_propagate_unchanged() {
        let proxy = Arc::new(RecordingProxy::new());
        proxy.fail_with(Some(proxy_failure("queue full")));
        let observer = observer_with(proxy.clone(), page());

        let err = observer.record_like(None).unwrap_err();
        assert_eq!(err.code_str(), "observer/proxy-failure");
        assert_eq!(err.message(), "queue full");
    }

    #[test]
    fn readiness_fires_page_view_before_link_rewriting() {
        let proxy = Arc::new(RecordingProxy::new());
        let doc = page();
        let observer = observer_with(proxy.clone(), doc.clone());

        observer.on_proxy_ready().unwrap();

        let events = proxy.recorded_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventTag::PageView);
        assert_eq!(doc.anchor_hrefs()[1], "http://external.com/page");

        proxy.deliver_visitor_id("V123");

        assert_eq!(
            doc.anchor_hrefs(),
            vec![
                "https://mysite.com/cart".to_string(),
                "http://external.com/page?leosyn=V123".to_string(),
                "http://external.com/page?a=1&leosyn=V123".to_string(),
            ]
        );
        assert_eq!(proxy.recorded_events().len(), 1);
    }

    #[test]
    fn readiness_notifies_hooks_after_rewriting() {
        let proxy = Arc::new(RecordingProxy::with_visitor_id("V7"));
        let doc = page();
        let observer = observer_with(proxy.clone(), doc.clone());

        let calls = Rc::new(RefCell::new(Vec::new()));
        let ga4_calls = calls.clone();
        let ga4_doc = doc.clone();
        let chat_calls = calls.clone();
        observer.set_sync_hooks(
            SyncHooks::new()
                .on_ga4_sync(move |id| {
                    let rewritten = ga4_doc.anchor_hrefs()[1].ends_with("leosyn=V7");
                    ga4_calls.borrow_mut().push(format!("ga4:{id}:{rewritten}"));
                })
                .on_chatbot_start(move |id| chat_calls.borrow_mut().push(format!("chat:{id}"))),
        );

        observer.on_proxy_ready().unwrap();

        assert_eq!(*calls.borrow(), vec!["ga4:V7:true", "chat:V7"]);
    }

    #[test]
    fn readiness_runs_only_once() {
        let proxy = Arc::new(RecordingProxy::with_visitor_id("V1"));
        let doc = page();
        let observer = observer_with(proxy.clone(), doc.clone());

        observer.on_proxy_ready().unwrap();
        observer.on_proxy_ready().unwrap();

        assert!(observer.is_ready());
        assert_eq!(proxy.recorded_events().len(), 1);
        assert_eq!(doc.anchor_hrefs()[1], "http://external.com/page?leosyn=V1");
    }

    #[test]
    fn touchpoint_is_captured_at_creation() {
        let observer = observer_with(Arc::new(RecordingProxy::new()), page());
        assert_eq!(observer.touchpoint().title, "Shop");
        assert_eq!(
            observer.touchpoint().url,
            "https://mysite.com/shop?utm_source=zalo"
        );
    }

    #[test]
    fn load_proxy_script_uses_config() {
        let doc = page();
        let observer = observer_with(Arc::new(RecordingProxy::new()), doc.clone());
        let script = observer.load_proxy_script().unwrap();
        assert_eq!(
            script.src,
            "https://cdn.example.com/js/leo-observer/leo.proxy.min.js"
        );
        assert_eq!(doc.scripts()[0], script);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn visitor_id_resolves_through_proxy_callback() {
        let proxy = Arc::new(RecordingProxy::with_visitor_id("V42"));
        let observer = observer_with(proxy, page());
        assert_eq!(observer.visitor_id().await.unwrap(), "V42");
    }

    #[test]
    fn track_payload_uses_tenant_and_touchpoint() {
        let observer = observer_with(Arc::new(RecordingProxy::new()), page());
        let payload = observer
            .track_payload("page-view", "V1", None)
            .unwrap();
        assert_eq!(payload.tenant_id, "PNJ");
        assert_eq!(payload.mediahost, "mysite.com");
        assert_eq!(
            payload.utmdata.and_then(|utm| utm.utmsource).as_deref(),
            Some("zalo")
        );

        let no_tenant = Observer::new(
            ObserverConfig::new("obs", "log.example.com", "cdn.example.com"),
            Arc::new(RecordingProxy::new()),
            page(),
        );
        let err = no_tenant.track_payload("page-view", "V1", None).unwrap_err();
        assert_eq!(err.code_str(), "observer/invalid-argument");
    }
}
