//! Configuration parsing for a scout session.
//!
//! Everything is read from a single JSON config file. Only the backend
//! `base_url` is mandatory; every tunable has a production default.
//!
//! # Example config
//!
//! ```json
//! {
//!   "scout": { "module_name": "scout", "log_path": "/tmp/log" },
//!   "session": { "agent_id": "agent-42", "username": "jdoe" },
//!   "reporter": {
//!     "base_url": "https://crm.example.com/api",
//!     "geocode_threshold_m": 500.0,
//!     "watch": { "distance_interval_m": 1.0, "time_interval_secs": 10 }
//!   },
//!   "events": {
//!     "url": "https://crm.example.com/api/events",
//!     "reconnect_delay_ms": 5000
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ScoutError;
use crate::logging::LogFormat;
use crate::types::{Accuracy, AgentIdentity};

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(default)]
    pub scout: Option<ModuleMeta>,

    /// Signed-in agent. Without it the position reporter stays idle.
    #[serde(default)]
    pub session: Option<AgentIdentity>,

    pub reporter: ReporterConfig,

    /// Live event stream. Omit to run without notifications.
    #[serde(default)]
    pub events: Option<EventsConfig>,
}

impl AppConfig {
    /// Parse a config from a JSON string and validate it.
    pub fn from_json_str(content: &str) -> Result<Self, ScoutError> {
        let config: AppConfig =
            serde_json::from_str(content).map_err(|e| ScoutError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a component misbehave at runtime.
    pub fn validate(&self) -> Result<(), ScoutError> {
        self.reporter.validate()?;
        if let Some(events) = &self.events {
            events.validate()?;
        }
        if self.session.as_ref().is_some_and(|s| s.agent_id.trim().is_empty()) {
            return Err(ScoutError::Config("session.agent_id must not be empty".into()));
        }
        Ok(())
    }

    /// Module name used as the log file prefix.
    pub fn module_name(&self) -> String {
        self.scout.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "scout".into())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.scout.as_ref().and_then(|m| m.log_path.clone())
    }

    pub fn log_format(&self) -> LogFormat {
        self.scout.as_ref().and_then(|m| m.log_format).unwrap_or_default()
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
    pub log_format: Option<LogFormat>,
}

// ---------------------------------------------------------------------------
// Position reporter
// ---------------------------------------------------------------------------

/// Settings for the position reporter.
#[derive(Debug, Clone, Deserialize)]
pub struct ReporterConfig {
    /// CRM backend base URL. Reports go to `{base_url}/data`.
    pub base_url: String,

    /// Reverse-geocoding service base URL (Nominatim-compatible).
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,

    /// `User-Agent` sent to the geocoder and the backend.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Re-geocode only when the agent moved strictly more than this, in meters.
    #[serde(default = "default_geocode_threshold_m")]
    pub geocode_threshold_m: f64,

    /// Per-request timeout for geocode and upload calls, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Platform location watch settings.
    #[serde(default)]
    pub watch: WatchOptions,
}

impl ReporterConfig {
    /// Config with defaults for everything except the backend URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            geocode_url: default_geocode_url(),
            user_agent: default_user_agent(),
            geocode_threshold_m: default_geocode_threshold_m(),
            http_timeout_secs: default_http_timeout_secs(),
            watch: WatchOptions::default(),
        }
    }

    /// Full upload endpoint, `{base_url}/data`.
    pub fn upload_url(&self) -> String {
        format!("{}/data", self.base_url.trim_end_matches('/'))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    fn validate(&self) -> Result<(), ScoutError> {
        check_http_url("reporter.base_url", &self.base_url)?;
        check_http_url("reporter.geocode_url", &self.geocode_url)?;
        if !self.geocode_threshold_m.is_finite() || self.geocode_threshold_m <= 0.0 {
            return Err(ScoutError::Config(format!(
                "reporter.geocode_threshold_m must be a positive number of meters, got {}",
                self.geocode_threshold_m
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(ScoutError::Config("reporter.http_timeout_secs must be > 0".into()));
        }
        if !self.watch.distance_interval_m.is_finite() || self.watch.distance_interval_m < 0.0 {
            return Err(ScoutError::Config("reporter.watch.distance_interval_m must be >= 0".into()));
        }
        Ok(())
    }
}

/// Options passed to the platform location watch.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WatchOptions {
    #[serde(default)]
    pub accuracy: Accuracy,

    /// Minimum movement between callbacks, in meters.
    #[serde(default = "default_distance_interval_m")]
    pub distance_interval_m: f64,

    /// Minimum time between callbacks, in seconds.
    #[serde(default = "default_time_interval_secs")]
    pub time_interval_secs: u64,
}

impl WatchOptions {
    pub fn time_interval(&self) -> Duration {
        Duration::from_secs(self.time_interval_secs)
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            distance_interval_m: default_distance_interval_m(),
            time_interval_secs: default_time_interval_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Live events
// ---------------------------------------------------------------------------

/// Settings for the live event stream.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Server-sent-events endpoint.
    pub url: String,

    /// Fixed delay between a stream failure and the next connect attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Sent as `Authorization: Bearer <token>` when present.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Extra HTTP headers for the stream request.
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl EventsConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            bearer_token: None,
            extra_headers: HashMap::new(),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    fn validate(&self) -> Result<(), ScoutError> {
        check_http_url("events.url", &self.url)?;
        if self.reconnect_delay_ms == 0 {
            return Err(ScoutError::Config("events.reconnect_delay_ms must be > 0".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Defaults (used by serde)
// ---------------------------------------------------------------------------

fn default_geocode_url() -> String {
    "https://nominatim.openstreetmap.org".into()
}

fn default_user_agent() -> String {
    concat!("scout/", env!("CARGO_PKG_VERSION")).into()
}

fn default_geocode_threshold_m() -> f64 {
    500.0
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_distance_interval_m() -> f64 {
    1.0
}

fn default_time_interval_secs() -> u64 {
    10
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn check_http_url(field: &str, value: &str) -> Result<(), ScoutError> {
    let parsed = url::Url::parse(value).map_err(|e| ScoutError::Config(format!("{field}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ScoutError::Config(format!("{field}: unsupported scheme '{other}'"))),
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(AppConfig::from_json_str(&content)?)
}
