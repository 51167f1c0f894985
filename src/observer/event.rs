use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::observer::constants::DEFAULT_CURRENCY_CODE;
use crate::observer::error::{invalid_argument, ObserverError};

/// Open key/value payload attached to every event.
pub type EventData = Map<String, Value>;

/// Which of the three generic proxy methods an event is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    View,
    Action,
    Conversion,
}

/// Closed catalogue of event-type tags understood by the proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventTag {
    PageView,
    ContentView,
    ItemView,
    AcceptTracking,
    Like,
    Share,
    ShortLinkClick,
    Search,
    AddToCart,
    SubmitContact,
    Purchase,
}

impl EventTag {
    pub const ALL: [EventTag; 11] = [
        EventTag::PageView,
        EventTag::ContentView,
        EventTag::ItemView,
        EventTag::AcceptTracking,
        EventTag::Like,
        EventTag::Share,
        EventTag::ShortLinkClick,
        EventTag::Search,
        EventTag::AddToCart,
        EventTag::SubmitContact,
        EventTag::Purchase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTag::PageView => "page-view",
            EventTag::ContentView => "content-view",
            EventTag::ItemView => "item-view",
            EventTag::AcceptTracking => "accept-tracking",
            EventTag::Like => "like",
            EventTag::Share => "share",
            EventTag::ShortLinkClick => "short-link-click",
            EventTag::Search => "search",
            EventTag::AddToCart => "add-to-cart",
            EventTag::SubmitContact => "submit-contact",
            EventTag::Purchase => "purchase",
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            EventTag::PageView | EventTag::ContentView | EventTag::ItemView => MetricKind::View,
            EventTag::Purchase => MetricKind::Conversion,
            _ => MetricKind::Action,
        }
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventTag {
    type Err = ObserverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EventTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == value)
            .ok_or_else(|| invalid_argument(format!("unknown event type `{value}`")))
    }
}

impl Serialize for EventTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Coerces a loosely typed value into event data; anything but a JSON object becomes `{}`.
pub fn event_data_from_loose(value: Value) -> EventData {
    match value {
        Value::Object(map) => map,
        _ => EventData::new(),
    }
}

/// Transaction fields forwarded with conversion events.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    pub shopping_cart_items: Vec<Value>,
    pub transaction_value: f64,
    pub currency_code: String,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            transaction_id: String::new(),
            shopping_cart_items: Vec::new(),
            transaction_value: 0.0,
            currency_code: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }
}

/// Arguments of the purchase event. Every field is optional and defaulted independently.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Purchase {
    pub event_data: Option<EventData>,
    pub shopping_cart_items: Option<Vec<Value>>,
    pub transaction_id: Option<String>,
    pub transaction_value: Option<f64>,
    pub currency_code: Option<String>,
}

impl Purchase {
    /// Builds a purchase from five loosely typed positional values. Values of the wrong JSON type
    /// fall back to the defaults `{}`, `[]`, `""`, `0` and `"USD"`.
    pub fn from_loose(
        event_data: Value,
        shopping_cart_items: Value,
        transaction_id: Value,
        transaction_value: Value,
        currency_code: Value,
    ) -> Self {
        Self {
            event_data: match event_data {
                Value::Object(map) => Some(map),
                _ => None,
            },
            shopping_cart_items: match shopping_cart_items {
                Value::Array(items) => Some(items),
                _ => None,
            },
            transaction_id: match transaction_id {
                Value::String(id) => Some(id),
                _ => None,
            },
            transaction_value: transaction_value.as_f64(),
            currency_code: match currency_code {
                Value::String(code) => Some(code),
                _ => None,
            },
        }
    }

    pub fn with_event_data(mut self, event_data: EventData) -> Self {
        self.event_data = Some(event_data);
        self
    }

    pub fn with_items(mut self, items: Vec<Value>) -> Self {
        self.shopping_cart_items = Some(items);
        self
    }

    pub fn with_transaction(mut self, id: impl Into<String>, value: f64) -> Self {
        self.transaction_id = Some(id.into());
        self.transaction_value = Some(value);
        self
    }

    pub fn with_currency(mut self, currency_code: impl Into<String>) -> Self {
        self.currency_code = Some(currency_code.into());
        self
    }

    /// Splits the purchase into its event data and a fully defaulted transaction.
    pub fn into_parts(self) -> (EventData, Transaction) {
        let defaults = Transaction::default();
        let transaction = Transaction {
            transaction_id: self.transaction_id.unwrap_or(defaults.transaction_id),
            shopping_cart_items: self
                .shopping_cart_items
                .unwrap_or(defaults.shopping_cart_items),
            transaction_value: self
                .transaction_value
                .unwrap_or(defaults.transaction_value),
            currency_code: self.currency_code.unwrap_or(defaults.currency_code),
        };
        (self.event_data.unwrap_or_default(), transaction)
    }
}

/// A single event as handed to the proxy.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_type: EventTag,
    pub metric: MetricKind,
    pub event_data: EventData,
    #[serde(flatten)]
    pub transaction: Option<Transaction>,
}

impl EventRecord {
    pub fn new(event_type: EventTag, event_data: EventData) -> Self {
        Self {
            event_type,
            metric: event_type.kind(),
            event_data,
            transaction: None,
        }
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transaction = Some(transaction);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_round_trip_through_strings() {
        for tag in EventTag::ALL {
            assert_eq!(tag.as_str().parse::<EventTag>().unwrap(), tag);
        }
        let err = "checkout".parse::<EventTag>().unwrap_err();
        assert_eq!(err.code_str(), "observer/invalid-argument");
    }

    #[test]
    fn tags_map_to_metric_kinds() {
        assert_eq!(EventTag::PageView.kind(), MetricKind::View);
        assert_eq!(EventTag::ItemView.kind(), MetricKind::View);
        assert_eq!(EventTag::Like.kind(), MetricKind::Action);
        assert_eq!(EventTag::AddToCart.kind(), MetricKind::Action);
        assert_eq!(EventTag::Purchase.kind(), MetricKind::Conversion);
    }

    #[test]
    fn loose_event_data_defaults_to_empty_object() {
        assert!(event_data_from_loose(Value::Null).is_empty());
        assert!(event_data_from_loose(json!("text")).is_empty());
        assert!(event_data_from_loose(json!([1, 2])).is_empty());
        let data = event_data_from_loose(json!({"sku": "A1"}));
        assert_eq!(data.get("sku"), Some(&json!("A1")));
    }

    #[test]
    fn purchase_from_mistyped_values_uses_defaults() {
        let purchase = Purchase::from_loose(
            json!("not-an-object"),
            json!({"not": "a list"}),
            json!(42),
            json!("12.5"),
            json!(false),
        );
        let (data, transaction) = purchase.into_parts();
        assert!(data.is_empty());
        assert!(transaction.shopping_cart_items.is_empty());
        assert_eq!(transaction.transaction_id, "");
        assert_eq!(transaction.transaction_value, 0.0);
        assert_eq!(transaction.currency_code, "USD");
    }

    #[test]
    fn purchase_from_well_typed_values_keeps_them() {
        let purchase = Purchase::from_loose(
            json!({"channel": "web"}),
            json!([{"sku": "R-01", "quantity": 2}]),
            json!("T-9"),
            json!(199.5),
            json!("VND"),
        );
        let (data, transaction) = purchase.into_parts();
        assert_eq!(data.get("channel"), Some(&json!("web")));
        assert_eq!(transaction.shopping_cart_items.len(), 1);
        assert_eq!(transaction.transaction_id, "T-9");
        assert_eq!(transaction.transaction_value, 199.5);
        assert_eq!(transaction.currency_code, "VND");
    }

    #[test]
    fn conversion_record_serializes_transaction_fields_inline() {
        let record = EventRecord::new(EventTag::Purchase, EventData::new())
            .with_transaction(Transaction::default());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["eventType"], "purchase");
        assert_eq!(value["metric"], "conversion");
        assert_eq!(value["currencyCode"], "USD");
        assert_eq!(value["shoppingCartItems"], json!([]));
    }
}
