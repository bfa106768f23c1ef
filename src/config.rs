//! Driver configuration: environment settings and driver metadata.

use crate::error::{IntegrationError, Result};
use crate::setup::DEFAULT_SETUP_ERROR_DELAY;
use crate::types::{default_language_string, LanguageText};
use crate::voice_session::DEFAULT_QUEUE_CAPACITY;
use crate::voice_stream::DEFAULT_SESSION_TIMEOUT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_INTERFACE: &str = "UC_INTEGRATION_INTERFACE";
pub const ENV_HTTP_PORT: &str = "UC_INTEGRATION_HTTP_PORT";
pub const ENV_HTTPS_ENABLED: &str = "UC_INTEGRATION_HTTPS_ENABLED";
pub const ENV_DISABLE_MDNS_PUBLISH: &str = "UC_DISABLE_MDNS_PUBLISH";
pub const ENV_CONFIG_HOME: &str = "UC_CONFIG_HOME";

pub const DEFAULT_LISTEN_INTERFACE: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9090;

/// Runtime settings of the integration API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Configured listen interface; `None` listens on all interfaces
    pub interface: Option<String>,
    pub port: u16,
    /// Not supported yet, only reported
    pub https_enabled: bool,
    pub disable_mdns_publish: bool,
    /// Directory for driver configuration files
    pub config_home: Option<PathBuf>,
    pub voice_session_timeout: Duration,
    /// Queued audio chunks per voice session
    pub voice_queue_capacity: usize,
    /// Delay before a setup error event is sent
    pub setup_error_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            interface: None,
            port: DEFAULT_PORT,
            https_enabled: false,
            disable_mdns_publish: false,
            config_home: None,
            voice_session_timeout: DEFAULT_SESSION_TIMEOUT,
            voice_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            setup_error_delay: DEFAULT_SETUP_ERROR_DELAY,
        }
    }
}

fn env_flag(value: Option<String>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "t"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ApiConfig {
    /// Read the settings from the `UC_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match non_empty(lookup(ENV_HTTP_PORT)) {
            Some(port) => port.trim().parse().map_err(|_| {
                IntegrationError::Config(format!("Invalid {}: {}", ENV_HTTP_PORT, port))
            })?,
            None => DEFAULT_PORT,
        };
        Ok(Self {
            interface: non_empty(lookup(ENV_INTERFACE)),
            port,
            https_enabled: env_flag(lookup(ENV_HTTPS_ENABLED)),
            disable_mdns_publish: env_flag(lookup(ENV_DISABLE_MDNS_PUBLISH)),
            config_home: non_empty(lookup(ENV_CONFIG_HOME)).map(PathBuf::from),
            ..Self::default()
        })
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_mdns_publish(mut self, enabled: bool) -> Self {
        self.disable_mdns_publish = !enabled;
        self
    }

    pub fn with_voice_session_timeout(mut self, timeout: Duration) -> Self {
        self.voice_session_timeout = timeout;
        self
    }

    pub fn with_voice_queue_capacity(mut self, capacity: usize) -> Self {
        self.voice_queue_capacity = capacity;
        self
    }

    pub fn with_setup_error_delay(mut self, delay: Duration) -> Self {
        self.setup_error_delay = delay;
        self
    }

    /// Interface the listener binds to
    pub fn listen_interface(&self) -> &str {
        self.interface.as_deref().unwrap_or(DEFAULT_LISTEN_INTERFACE)
    }

    /// Advertised driver URL.
    ///
    /// A configured `ws://` or `wss://` URL is used as is. Otherwise the URL
    /// is built from the interface and port, if an interface is known.
    pub fn driver_url(&self, configured: Option<&str>, port: u16) -> Option<String> {
        let host = configured.or(self.interface.as_deref())?;
        if host.starts_with("ws://") || host.starts_with("wss://") {
            return Some(host.to_string());
        }
        let host = self.interface.as_deref().unwrap_or(host);
        Some(format!("ws://{}:{}", host, port))
    }
}

/// Developer information of a driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Developer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Static driver metadata, usually loaded from `driver.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverMetadata {
    pub driver_id: String,
    pub name: LanguageText,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_core_api: Option<String>,
    #[serde(default)]
    pub developer: Developer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_url: Option<String>,
    /// Remaining keys such as `icon`, `description` or `setup_data_schema`
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DriverMetadata {
    /// Load the metadata JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            IntegrationError::Config(format!("Invalid driver metadata {}: {}", path.display(), e))
        })
    }

    /// Driver name in the default language
    pub fn display_name(&self) -> String {
        default_language_string(Some(&self.name), "Unknown driver")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.listen_interface(), "0.0.0.0");
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn env_values() {
        let config = ApiConfig::from_lookup(lookup(&[
            (ENV_INTERFACE, "192.168.1.10"),
            (ENV_HTTP_PORT, "9988"),
            (ENV_DISABLE_MDNS_PUBLISH, "T"),
            (ENV_HTTPS_ENABLED, "no"),
            (ENV_CONFIG_HOME, "/data"),
        ]))
        .unwrap();
        assert_eq!(config.interface.as_deref(), Some("192.168.1.10"));
        assert_eq!(config.port, 9988);
        assert!(config.disable_mdns_publish);
        assert!(!config.https_enabled);
        assert_eq!(config.config_home, Some(PathBuf::from("/data")));
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[(ENV_HTTP_PORT, "http")])),
            Err(IntegrationError::Config(_))
        ));
    }

    #[test]
    fn driver_url_rules() {
        let config = ApiConfig::default();
        assert_eq!(config.driver_url(None, 9090), None);
        assert_eq!(
            config.driver_url(Some("wss://driver.local:443"), 9090).as_deref(),
            Some("wss://driver.local:443")
        );

        let config = config.with_interface("10.0.0.5");
        assert_eq!(config.driver_url(None, 9191).as_deref(), Some("ws://10.0.0.5:9191"));
        assert_eq!(
            config.driver_url(Some("driver.local"), 9191).as_deref(),
            Some("ws://10.0.0.5:9191")
        );
    }

    #[test]
    fn metadata_keeps_unknown_keys() {
        let metadata: DriverMetadata = serde_json::from_value(serde_json::json!({
            "driver_id": "demo",
            "name": {"de": "Demo Treiber", "en-US": "Demo driver"},
            "version": "1.0.0",
            "developer": {"name": "Demo Inc."},
            "port": 9191,
            "icon": "uc:integration"
        }))
        .unwrap();
        assert_eq!(metadata.port, Some(9191));
        assert_eq!(metadata.display_name(), "Demo driver");
        assert_eq!(metadata.extra["icon"], "uc:integration");

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["icon"], "uc:integration");
        assert!(value.get("driver_url").is_none());
    }
}
