//! Observer configuration and the environment sources it can be resolved from.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::observer::constants::{CONFIG_ENV_VAR, CONFIG_PATH_ENV_VAR, DEFAULT_PROTOCOL};
use crate::observer::error::{invalid_config, ObserverResult};

/// Values the bootstrap loader and the event facade need before the proxy is loaded.
///
/// The configuration is passed explicitly when constructing an [`Observer`](crate::observer::Observer);
/// [`ObserverConfig::from_environment`] is a convenience for deployments that inject it from the
/// outside.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObserverConfig {
    /// Tracking identifier of the observer registered in the CDP.
    pub observer_id: String,
    /// Domain the proxy sends its collected events to.
    pub log_domain: String,
    /// Domain the proxy script is served from.
    pub cdn_domain: String,
    /// Page protocol including the trailing colon. Empty means `https:`.
    pub protocol: String,
    pub tenant_id: Option<String>,
}

impl ObserverConfig {
    pub fn new(
        observer_id: impl Into<String>,
        log_domain: impl Into<String>,
        cdn_domain: impl Into<String>,
    ) -> Self {
        Self {
            observer_id: observer_id.into(),
            log_domain: log_domain.into(),
            cdn_domain: cdn_domain.into(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            tenant_id: None,
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Returns the configured protocol, falling back to `https:`.
    pub fn protocol(&self) -> &str {
        if self.protocol.trim().is_empty() {
            DEFAULT_PROTOCOL
        } else {
            &self.protocol
        }
    }

    pub fn validate(&self) -> ObserverResult<()> {
        if self.cdn_domain.trim().is_empty() {
            return Err(invalid_config("observer cdn_domain must not be empty"));
        }
        if !self.protocol().ends_with(':') {
            return Err(invalid_config(format!(
                "observer protocol `{}` must end with ':'",
                self.protocol()
            )));
        }
        Ok(())
    }

    /// Resolves the configuration from the `__LEO_OBSERVER_CONFIG__` env var (inline JSON), then
    /// the JSON file named by `__LEO_OBSERVER_CONFIG_PATH`, then the `__LEO_OBSERVER_CONFIG__`
    /// browser global. The first source present wins; a malformed source yields `None`.
    pub fn from_environment() -> Option<Self> {
        if let Ok(raw) = env::var(CONFIG_ENV_VAR) {
            return parse_config_json(CONFIG_ENV_VAR, &raw);
        }
        if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR) {
            return read_config_file(Path::new(&path));
        }
        config_from_global()
    }
}

fn read_config_file(path: &Path) -> Option<ObserverConfig> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_config_json(&path.display().to_string(), &contents),
        Err(err) => {
            log::warn!("Cannot read observer configuration {}: {err}", path.display());
            None
        }
    }
}

/// Parses one configuration source. Only a JSON object is accepted.
fn parse_config_json(origin: &str, raw: &str) -> Option<ObserverConfig> {
    let parsed = serde_json::from_str::<Value>(raw).and_then(|value| {
        if value.is_object() {
            serde_json::from_value::<ObserverConfig>(value).map(Some)
        } else {
            Ok(None)
        }
    });
    match parsed {
        Ok(Some(config)) => Some(config),
        Ok(None) => {
            log::warn!("Ignoring observer configuration from {origin}: expected a JSON object");
            None
        }
        Err(err) => {
            log::warn!("Ignoring malformed observer configuration from {origin}: {err}");
            None
        }
    }
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn config_from_global() -> Option<ObserverConfig> {
    use wasm_bindgen::JsValue;

    let global = js_sys::global();
    let value = js_sys::Reflect::get(&global, &JsValue::from_str(CONFIG_ENV_VAR)).ok()?;
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let serialized = js_sys::JSON::stringify(&value).ok()?.as_string()?;
    parse_config_json("window global", &serialized)
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn config_from_global() -> Option<ObserverConfig> {
    None
}
