/// Path of the proxy script on the configured CDN domain.
pub const PROXY_SCRIPT_PATH: &str = "/js/leo-observer/leo.proxy.min.js";

pub const DEFAULT_PROTOCOL: &str = "https:";

/// Query parameter carrying the visitor ID on outbound links.
pub const VISITOR_SYNC_PARAM: &str = "leosyn";

pub const DEFAULT_CURRENCY_CODE: &str = "USD";

pub const UTM_PREFIX: &str = "utm_";

pub const TRACK_SCHEMA_VERSION: &str = "2025.04.28";

pub const CONFIG_ENV_VAR: &str = "__LEO_OBSERVER_CONFIG__";
pub const CONFIG_PATH_ENV_VAR: &str = "__LEO_OBSERVER_CONFIG_PATH";

pub const PROXY_GLOBAL: &str = "LeoObserverProxy";
pub const PROXY_READY_GLOBAL: &str = "leoObserverProxyReady";
pub const GA4_SYNC_GLOBAL: &str = "synchLeoCdpToGA4";
pub const CHATBOT_START_GLOBAL: &str = "startLeoChatBot";
