//! Browser bindings: the real DOM, the `LeoObserverProxy` global and the JS entry points.

use std::cell::RefCell;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlAnchorElement, HtmlScriptElement};

use crate::observer::api::Observer;
use crate::observer::bootstrap::ProxyScript;
use crate::observer::config::ObserverConfig;
use crate::observer::constants::{
    CHATBOT_START_GLOBAL, GA4_SYNC_GLOBAL, PROXY_GLOBAL, PROXY_READY_GLOBAL,
};
use crate::observer::document::PageDocument;
use crate::observer::error::{
    internal_error, invalid_argument, invalid_config, missing_script_node, proxy_failure,
    proxy_unavailable, ObserverError, ObserverResult,
};
use crate::observer::event::{event_data_from_loose, EventData, EventTag, Purchase};
use crate::observer::hooks::SyncHooks;
use crate::observer::proxy::{ObserverProxy, VisitorIdCallback};

/// [`PageDocument`] backed by `window.document`.
#[derive(Clone, Debug)]
pub struct WebDocument {
    document: Document,
}

impl WebDocument {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn from_window() -> ObserverResult<Self> {
        let window = web_sys::window().ok_or_else(|| internal_error("Window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| internal_error("Document not available"))?;
        Ok(Self::new(document))
    }

    fn anchor(&self, index: usize) -> Option<HtmlAnchorElement> {
        self.document
            .get_elements_by_tag_name("a")
            .item(index as u32)
            .and_then(|element| element.dyn_into::<HtmlAnchorElement>().ok())
    }
}

impl PageDocument for WebDocument {
    fn title(&self) -> String {
        self.document.title()
    }

    fn url(&self) -> String {
        self.document
            .location()
            .and_then(|location| location.href().ok())
            .unwrap_or_default()
    }

    fn host(&self) -> String {
        self.document
            .location()
            .and_then(|location| location.host().ok())
            .unwrap_or_default()
    }

    fn script_count(&self) -> usize {
        self.document.get_elements_by_tag_name("script").length() as usize
    }

    fn insert_script_before_first(&self, script: &ProxyScript) -> ObserverResult<()> {
        let first = self
            .document
            .get_elements_by_tag_name("script")
            .item(0)
            .ok_or_else(|| missing_script_node("document has no <script> element"))?;
        let parent = first
            .parent_node()
            .ok_or_else(|| missing_script_node("first <script> element has no parent"))?;

        let element = self
            .document
            .create_element("script")
            .map_err(|err| internal_error(format!("Failed to create script: {err:?}")))?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|_| internal_error("Script element has wrong type"))?;
        element.set_src(&script.src);
        element.set_async(script.async_load);
        element.set_defer(script.defer);

        let first_node: &web_sys::Node = first.as_ref();
        parent
            .insert_before(&element, Some(first_node))
            .map_err(|err| internal_error(format!("Failed to insert proxy script: {err:?}")))?;
        Ok(())
    }

    fn anchor_hrefs(&self) -> Vec<String> {
        let anchors = self.document.get_elements_by_tag_name("a");
        (0..anchors.length())
            .filter_map(|index| anchors.item(index))
            .map(|element| match element.dyn_into::<HtmlAnchorElement>() {
                Ok(anchor) => anchor.href(),
                Err(_) => String::new(),
            })
            .collect()
    }

    fn set_anchor_href(&self, index: usize, href: &str) -> ObserverResult<()> {
        let anchor = self
            .anchor(index)
            .ok_or_else(|| invalid_argument(format!("anchor index {index} out of range")))?;
        anchor.set_href(href);
        Ok(())
    }
}

/// [`ObserverProxy`] that calls the `LeoObserverProxy` global.
///
/// The global is looked up on every call since it only exists once the proxy script has executed.
#[derive(Clone, Debug, Default)]
pub struct JsObserverProxy;

impl JsObserverProxy {
    pub fn new() -> Self {
        Self
    }

    fn target(&self) -> ObserverResult<js_sys::Object> {
        let global = js_sys::global();
        let value = js_sys::Reflect::get(&global, &JsValue::from_str(PROXY_GLOBAL))
            .map_err(|err| proxy_unavailable(js_error_message(err)))?;
        if value.is_null() || value.is_undefined() {
            return Err(proxy_unavailable(format!("{PROXY_GLOBAL} is not loaded")));
        }
        Ok(value.unchecked_into())
    }

    fn call(&self, method: &str, args: &js_sys::Array) -> ObserverResult<()> {
        let target = self.target()?;
        let function = js_sys::Reflect::get(&target, &JsValue::from_str(method))
            .map_err(|err| proxy_unavailable(js_error_message(err)))?
            .dyn_into::<js_sys::Function>()
            .map_err(|_| proxy_unavailable(format!("{PROXY_GLOBAL}.{method} is not a function")))?;
        function
            .apply(&target, args)
            .map_err(|err| proxy_failure(format!("{method}() threw: {}", js_error_message(err))))?;
        Ok(())
    }
}

impl ObserverProxy for JsObserverProxy {
    fn record_view_event(&self, tag: EventTag, data: &EventData) -> ObserverResult<()> {
        let args = js_sys::Array::of2(&JsValue::from_str(tag.as_str()), &to_js(data)?);
        self.call("recordViewEvent", &args)
    }

    fn record_action_event(&self, tag: EventTag, data: &EventData) -> ObserverResult<()> {
        let args = js_sys::Array::of2(&JsValue::from_str(tag.as_str()), &to_js(data)?);
        self.call("recordActionEvent", &args)
    }

    fn record_conversion_event(
        &self,
        tag: EventTag,
        data: &EventData,
        transaction_id: &str,
        shopping_cart_items: &[Value],
        transaction_value: f64,
        currency_code: &str,
    ) -> ObserverResult<()> {
        let args = js_sys::Array::new();
        args.push(&JsValue::from_str(tag.as_str()));
        args.push(&to_js(data)?);
        args.push(&JsValue::from_str(transaction_id));
        args.push(&to_js(shopping_cart_items)?);
        args.push(&JsValue::from_f64(transaction_value));
        args.push(&JsValue::from_str(currency_code));
        self.call("recordConversionEvent", &args)
    }

    fn synch_visitor_id(&self, callback: VisitorIdCallback) -> ObserverResult<()> {
        let js_callback = Closure::once_into_js(move |visitor_id: JsValue| {
            callback(visitor_id.as_string().unwrap_or_default());
        });
        self.call("synchLeoVisitorId", &js_sys::Array::of1(&js_callback))
    }
}

impl SyncHooks {
    /// Hooks that call the `synchLeoCdpToGA4` and `startLeoChatBot` globals.
    ///
    /// Each global is looked up when the visitor ID arrives and skipped when it is not a function
    /// at that point. An exception thrown by a global is rethrown to the proxy.
    pub fn from_window_globals() -> Self {
        SyncHooks::new()
            .on_ga4_sync(|visitor_id| call_global_hook(GA4_SYNC_GLOBAL, visitor_id))
            .on_chatbot_start(|visitor_id| call_global_hook(CHATBOT_START_GLOBAL, visitor_id))
    }
}

fn global_function(name: &str) -> Option<js_sys::Function> {
    let global = js_sys::global();
    js_sys::Reflect::get(&global, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<js_sys::Function>()
        .ok()
}

fn call_global_hook(name: &str, visitor_id: &str) {
    let Some(function) = global_function(name) else {
        log::debug!("{name} is not defined; skipping");
        return;
    };
    if let Err(err) = function.call1(&JsValue::NULL, &JsValue::from_str(visitor_id)) {
        log::warn!("{name} threw: {}", js_error_message(err.clone()));
        wasm_bindgen::throw_val(err);
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> ObserverResult<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| internal_error(format!("Failed to convert event data: {err}")))
}

fn from_js(value: JsValue) -> Value {
    if value.is_undefined() || value.is_null() {
        return Value::Null;
    }
    serde_wasm_bindgen::from_value(value).unwrap_or(Value::Null)
}

fn js_error_message(value: JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

fn to_js_error(err: ObserverError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

thread_local! {
    static INSTALLED: RefCell<Option<Observer>> = const { RefCell::new(None) };
}

/// Makes `observer` the instance driven by the JS entry points.
pub fn install(observer: Observer) {
    INSTALLED.with(|slot| *slot.borrow_mut() = Some(observer));
}

fn with_installed<T>(f: impl FnOnce(&Observer) -> ObserverResult<T>) -> Result<T, JsValue> {
    let observer = INSTALLED
        .with(|slot| slot.borrow().clone())
        .ok_or_else(|| to_js_error(invalid_config("observer has not been initialised")))?;
    f(&observer).map_err(to_js_error)
}

/// Builds an observer from the injected configuration, installs it, publishes the
/// `leoObserverProxyReady` global for the proxy to call and schedules the proxy load.
#[wasm_bindgen(js_name = initLeoObserver)]
pub fn init_leo_observer() -> Result<(), JsValue> {
    let config = ObserverConfig::from_environment()
        .ok_or_else(|| to_js_error(invalid_config("no observer configuration found")))?;
    config.validate().map_err(to_js_error)?;
    let document = WebDocument::from_window().map_err(to_js_error)?;
    let observer = Observer::new(config, Arc::new(JsObserverProxy::new()), Arc::new(document));
    observer.set_sync_hooks(SyncHooks::from_window_globals());
    install(observer.clone());
    register_ready_callback()?;
    observer.load_proxy_script().map_err(to_js_error)?;
    Ok(())
}

fn register_ready_callback() -> Result<(), JsValue> {
    let ready = Closure::wrap(
        Box::new(leo_observer_proxy_ready) as Box<dyn FnMut() -> Result<(), JsValue>>
    );
    js_sys::Reflect::set(
        &js_sys::global(),
        &JsValue::from_str(PROXY_READY_GLOBAL),
        ready.as_ref().unchecked_ref(),
    )?;
    ready.forget();
    Ok(())
}

/// Readiness callback invoked by the proxy script.
#[wasm_bindgen(js_name = leoObserverProxyReady)]
pub fn leo_observer_proxy_ready() -> Result<(), JsValue> {
    with_installed(|observer| observer.on_proxy_ready())
}

fn forward_named(
    event_data: JsValue,
    record: impl FnOnce(&Observer, Option<EventData>) -> ObserverResult<()>,
) -> Result<(), JsValue> {
    let data = event_data_from_loose(from_js(event_data));
    with_installed(|observer| record(observer, Some(data)))
}

#[wasm_bindgen(js_name = recordEventPageView)]
pub fn record_event_page_view(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_page_view)
}

#[wasm_bindgen(js_name = recordEventContentView)]
pub fn record_event_content_view(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_content_view)
}

#[wasm_bindgen(js_name = recordEventItemView)]
pub fn record_event_item_view(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_item_view)
}

#[wasm_bindgen(js_name = recordEventAcceptTracking)]
pub fn record_event_accept_tracking(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_accept_tracking)
}

#[wasm_bindgen(js_name = recordEventLike)]
pub fn record_event_like(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_like)
}

#[wasm_bindgen(js_name = recordEventShare)]
pub fn record_event_share(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_share)
}

#[wasm_bindgen(js_name = recordEventShortLinkClick)]
pub fn record_event_short_link_click(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_short_link_click)
}

#[wasm_bindgen(js_name = recordEventSearch)]
pub fn record_event_search(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_search)
}

#[wasm_bindgen(js_name = recordEventAddToCart)]
pub fn record_event_add_to_cart(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_add_to_cart)
}

#[wasm_bindgen(js_name = recordEventSubmitContact)]
pub fn record_event_submit_contact(event_data: JsValue) -> Result<(), JsValue> {
    forward_named(event_data, Observer::record_submit_contact)
}

/// Records any catalogue event by its tag, e.g. `recordLeoEvent("like", {...})`.
#[wasm_bindgen(js_name = recordLeoEvent)]
pub fn record_leo_event(event_type: &str, event_data: JsValue) -> Result<(), JsValue> {
    with_installed(|observer| {
        let tag: EventTag = event_type.parse()?;
        if tag == EventTag::Purchase {
            return observer.record_purchase(Purchase::default().with_event_data(
                event_data_from_loose(from_js(event_data)),
            ));
        }
        observer.record_event_loose(tag, from_js(event_data))
    })
}

#[wasm_bindgen(js_name = recordEventPurchase)]
pub fn record_event_purchase(
    event_data: JsValue,
    shopping_cart_items: JsValue,
    transaction_id: JsValue,
    transaction_value: JsValue,
    currency_code: JsValue,
) -> Result<(), JsValue> {
    with_installed(|observer| {
        observer.record_purchase(Purchase::from_loose(
            from_js(event_data),
            from_js(shopping_cart_items),
            from_js(transaction_id),
            from_js(transaction_value),
            from_js(currency_code),
        ))
    })
}
