//! Contract of the externally loaded observer proxy and an in-memory implementation.

use std::fmt;
use std::sync::Mutex;

use serde_json::Value;

use crate::observer::event::{EventData, EventRecord, EventTag, Transaction};
use crate::observer::error::{ObserverError, ObserverResult};

/// Receives the visitor ID once the proxy has resolved it.
pub type VisitorIdCallback = Box<dyn FnOnce(String) + 'static>;

/// Generic recording methods exposed by the proxy script.
///
/// Transport, batching and visitor persistence live behind this trait; errors raised by an
/// implementation are returned to the caller of the facade unchanged.
pub trait ObserverProxy {
    fn record_view_event(&self, tag: EventTag, data: &EventData) -> ObserverResult<()>;

    fn record_action_event(&self, tag: EventTag, data: &EventData) -> ObserverResult<()>;

    fn record_conversion_event(
        &self,
        tag: EventTag,
        data: &EventData,
        transaction_id: &str,
        shopping_cart_items: &[Value],
        transaction_value: f64,
        currency_code: &str,
    ) -> ObserverResult<()>;

    /// Requests the visitor ID. The callback may run before this returns or at any later point.
    fn synch_visitor_id(&self, callback: VisitorIdCallback) -> ObserverResult<()>;
}

/// Proxy that keeps every event in memory instead of sending it anywhere.
///
/// Visitor-ID requests are answered immediately when a visitor ID is known, otherwise they are
/// queued until [`RecordingProxy::deliver_visitor_id`] is called.
#[derive(Default)]
pub struct RecordingProxy {
    events: Mutex<Vec<EventRecord>>,
    visitor_id: Mutex<Option<String>>,
    pending: Mutex<Vec<VisitorIdCallback>>,
    failure: Mutex<Option<ObserverError>>,
}

impl fmt::Debug for RecordingProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingProxy")
            .field("events", &self.events.lock().unwrap().len())
            .field("visitor_id", &self.visitor_id.lock().unwrap())
            .field("pending", &self.pending.lock().unwrap().len())
            .finish()
    }
}

impl RecordingProxy {
    /// Proxy that queues visitor-ID requests until one is delivered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Proxy that answers visitor-ID requests immediately with `visitor_id`.
    pub fn with_visitor_id(visitor_id: impl Into<String>) -> Self {
        let proxy = Self::default();
        *proxy.visitor_id.lock().unwrap() = Some(visitor_id.into());
        proxy
    }

    pub fn recorded_events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    pub fn pending_visitor_requests(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Stores the visitor ID and runs every queued callback with it.
    pub fn deliver_visitor_id(&self, visitor_id: impl Into<String>) {
        let visitor_id = visitor_id.into();
        *self.visitor_id.lock().unwrap() = Some(visitor_id.clone());
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        for callback in pending {
            callback(visitor_id.clone());
        }
    }

    /// Makes every subsequent record call fail with `error`; `None` restores normal behaviour.
    pub fn fail_with(&self, error: Option<ObserverError>) {
        *self.failure.lock().unwrap() = error;
    }

    fn record(&self, record: EventRecord) -> ObserverResult<()> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.events.lock().unwrap().push(record);
        Ok(())
    }
}

impl ObserverProxy for RecordingProxy {
    fn record_view_event(&self, tag: EventTag, data: &EventData) -> ObserverResult<()> {
        self.record(EventRecord::new(tag, data.clone()))
    }

    fn record_action_event(&self, tag: EventTag, data: &EventData) -> ObserverResult<()> {
        self.record(EventRecord::new(tag, data.clone()))
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
        let transaction = Transaction {
            transaction_id: transaction_id.to_string(),
            shopping_cart_items: shopping_cart_items.to_vec(),
            transaction_value,
            currency_code: currency_code.to_string(),
        };
        self.record(EventRecord::new(tag, data.clone()).with_transaction(transaction))
    }

    fn synch_visitor_id(&self, callback: VisitorIdCallback) -> ObserverResult<()> {
        let known = self.visitor_id.lock().unwrap().clone();
        match known {
            Some(visitor_id) => callback(visitor_id),
            None => self.pending.lock().unwrap().push(callback),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::error::proxy_failure;
    use std::rc::Rc;
    use std::cell::RefCell;

    #[test]
    fn queues_visitor_requests_until_delivered() {
        let proxy = RecordingProxy::new();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        proxy
            .synch_visitor_id(Box::new(move |id| *sink.borrow_mut() = Some(id)))
            .unwrap();
        assert_eq!(proxy.pending_visitor_requests(), 1);
        assert!(seen.borrow().is_none());

        proxy.deliver_visitor_id("V9");
        assert_eq!(proxy.pending_visitor_requests(), 0);
        assert_eq!(seen.borrow().as_deref(), Some("V9"));
    }

    #[test]
    fn answers_immediately_when_visitor_known() {
        let proxy = RecordingProxy::with_visitor_id("V1");
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        proxy
            .synch_visitor_id(Box::new(move |id| *sink.borrow_mut() = Some(id)))
            .unwrap();
        assert_eq!(seen.borrow().as_deref(), Some("V1"));
    }

    #[test]
    fn configured_failure_is_returned_and_nothing_recorded() {
        let proxy = RecordingProxy::new();
        proxy.fail_with(Some(proxy_failure("transport down")));
        let err = proxy
            .record_action_event(EventTag::Like, &EventData::new())
            .unwrap_err();
        assert_eq!(err.code_str(), "observer/proxy-failure");
        assert!(proxy.recorded_events().is_empty());
    }
}
