//! JSON body accepted by the CDP tracking endpoint.
//!
//! The proxy normally builds and sends this itself. The types here let server-side code and tests
//! produce the same document, e.g. to replay events or to check what the proxy will be fed.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::observer::constants::TRACK_SCHEMA_VERSION;
use crate::observer::error::{internal_error, invalid_argument, ObserverResult};
use crate::observer::event::EventData;
use crate::observer::touchpoint::Touchpoint;
use crate::observer::utm::parse_utm_params;

const MAX_METRIC_LEN: usize = 50;
const MAX_ID_LEN: usize = 36;

/// Campaign attribution extracted from the `utm_*` parameters of the touchpoint URL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UtmData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utmsource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utmmedium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utmcampaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utmterm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utmcontent: Option<String>,
}

impl UtmData {
    /// Returns `None` when the URL carries none of the five campaign parameters.
    pub fn from_url(url: &str) -> Option<Self> {
        let mut params = parse_utm_params(url);
        let data = Self {
            utmsource: params.remove("utm_source"),
            utmmedium: params.remove("utm_medium"),
            utmcampaign: params.remove("utm_campaign"),
            utmterm: params.remove("utm_term"),
            utmcontent: params.remove("utm_content"),
        };
        if data == Self::default() {
            None
        } else {
            Some(data)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackPayload {
    pub schema_version: String,
    pub event_id: String,
    pub tenant_id: String,
    /// UTC timestamp formatted as `YYYY-MM-DDTHH:MM:SSZ`.
    pub datetime: String,
    /// Milliseconds since the Unix epoch.
    pub unix_timestamp: i64,
    pub metric: String,
    pub visid: String,
    pub mediahost: String,
    pub tpurl: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utmdata: Option<UtmData>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub eventdata: Map<String, Value>,
}

impl TrackPayload {
    /// Builds a payload stamped with the current time and a fresh event ID. UTM data is taken from
    /// the touchpoint URL.
    pub fn new(
        tenant_id: impl Into<String>,
        metric: impl Into<String>,
        visitor_id: impl Into<String>,
        touchpoint: &Touchpoint,
    ) -> Self {
        Self::at(tenant_id, metric, visitor_id, touchpoint, Utc::now())
    }

    pub fn at(
        tenant_id: impl Into<String>,
        metric: impl Into<String>,
        visitor_id: impl Into<String>,
        touchpoint: &Touchpoint,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: TRACK_SCHEMA_VERSION.to_string(),
            event_id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            datetime: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            unix_timestamp: timestamp.timestamp_millis(),
            metric: metric.into(),
            visid: visitor_id.into(),
            mediahost: touchpoint.host(),
            tpurl: touchpoint.url.clone(),
            utmdata: UtmData::from_url(&touchpoint.url),
            eventdata: Map::new(),
        }
    }

    pub fn with_event_data(mut self, event_data: EventData) -> Self {
        self.eventdata = event_data;
        self
    }

    pub fn with_utm(mut self, utm: Option<UtmData>) -> Self {
        self.utmdata = utm;
        self
    }

    /// Applies the length limits the tracking endpoint enforces before accepting an event.
    pub fn validate(&self) -> ObserverResult<()> {
        let metric_len = self.metric.chars().count();
        if metric_len == 0 || metric_len >= MAX_METRIC_LEN {
            return Err(invalid_argument(format!(
                "metric must be between 1 and {} characters",
                MAX_METRIC_LEN - 1
            )));
        }
        check_id("visid", &self.visid)?;
        check_id("tenant_id", &self.tenant_id)
    }

    pub fn to_json(&self) -> ObserverResult<String> {
        serde_json::to_string(self).map_err(|err| {
            internal_error(format!("failed to encode track payload: {err}"))
        })
    }
}

fn check_id(field: &str, value: &str) -> ObserverResult<()> {
    let len = value.chars().count();
    if len == 0 || len > MAX_ID_LEN {
        return Err(invalid_argument(format!(
            "{field} must be between 1 and {MAX_ID_LEN} characters"
        )));
    }
    Ok(())
}
