use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default feed URL. `{{user_key}}` and `{{access_key}}` are expanded per request.
pub const DEFAULT_FEED_URL: &str = "https://server.fseconomy.net/data?userkey={{user_key}}&format=csv&query=fbos&search=key&readaccesskey={{access_key}}";

/// Default flight log URL for the monthly maintenance report.
pub const DEFAULT_FLIGHT_LOG_URL: &str = "https://server.fseconomy.net/data?userkey={{user_key}}&format=csv&query=flightlogs&search=monthyear&readaccesskey={{user_key}}&month={{month}}&year={{year}}";

/// Root configuration for fbowatch.
///
/// Deserialized once from a JSON file at startup, then patched with
/// environment overrides for secrets. Nothing mutates it afterwards; every
/// component receives a reference (or a copy of the piece it needs).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, Default)]
pub struct Config {
    /// Rule thresholds.
    #[serde(default)]
    #[validate]
    pub thresholds: Thresholds,

    /// Remote FBO feed access.
    #[serde(default)]
    #[validate]
    pub feed: FeedConfig,

    /// Outbound channel (webhook) settings.
    #[serde(default)]
    #[validate]
    pub channel: ChannelConfig,

    /// Notification queue file.
    #[serde(default)]
    #[validate]
    pub queue: QueueConfig,

    /// Check, heartbeat and delivery timing.
    #[serde(default)]
    #[validate]
    pub schedule: ScheduleConfig,

    /// Monthly flight-hour cost report. Disabled when `aircraft` is empty.
    #[serde(default)]
    #[validate]
    pub maintenance: MaintenanceConfig,
}

/// Minimum values below which a rule fires.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, Validate, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// Days of supplies on hand.
    #[validate(minimum = 0.0)]
    pub supplies_days: f64,
    /// Jet-A on hand, in kg.
    #[validate(minimum = 0.0)]
    pub jet_a_kg: f64,
    /// 100LL avgas on hand, in kg.
    #[validate(minimum = 0.0)]
    pub avgas_kg: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            supplies_days: 5.0,
            jet_a_kg: 5000.0,
            avgas_kg: 2000.0,
        }
    }
}

/// Feed access. One request is made per entry of `access_keys`, in order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct FeedConfig {
    /// URL template; supports `{{user_key}}` and `{{access_key}}`.
    pub url_template: String,
    /// Feed user key (env: `FSEUSER`).
    pub user_key: String,
    /// Group read access keys (env: `FSEGROUP1`, `FSEGROUP2`, ...).
    pub access_keys: Vec<String>,
    /// Per-request timeout in seconds.
    #[validate(minimum = 1)]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_FEED_URL.to_string(),
            user_key: String::new(),
            access_keys: Vec::new(),
            timeout_secs: 30,
        }
    }
}

/// Outbound webhook.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct ChannelConfig {
    /// Webhook URL (env: `FBOHOOK`).
    pub webhook_url: String,
    /// Per-request timeout in seconds.
    #[validate(minimum = 1)]
    pub timeout_secs: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Queue file location and lock retry policy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct QueueConfig {
    /// Path of the queue document. A sidecar `<path>.lock` is created next to it.
    pub path: PathBuf,
    /// How many times to try the lock before giving up.
    #[validate(minimum = 1)]
    pub lock_attempts: u32,
    /// Base delay between lock attempts, in milliseconds (jitter is added).
    pub lock_retry_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("fsedisco_msg.json"),
            lock_attempts: 20,
            lock_retry_ms: 50,
        }
    }
}

/// Timing. All times of day are `HH:MM` in UTC.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Times of day at which the FBO check runs.
    #[validate(min_items = 1)]
    pub check_times: Vec<String>,
    /// Log a liveness line every hour on the hour.
    pub heartbeat: bool,
    /// Seconds the delivery worker waits between queue polls.
    #[validate(minimum = 1)]
    pub delivery_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_times: vec!["09:00".to_string(), "20:00".to_string()],
            heartbeat: true,
            delivery_interval_secs: 60,
        }
    }
}

/// Monthly maintenance cost report.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Flight log URL template; supports `{{user_key}}`, `{{month}}` and `{{year}}`.
    pub url_template: String,
    /// Time of day (on the 1st of the month) the report runs.
    pub report_time: String,
    /// Aircraft registration -> hourly maintenance rate in dollars.
    pub aircraft: AircraftRates,
}

/// Aircraft registration -> hourly rate.
pub type AircraftRates = BTreeMap<String, f64>;

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_FLIGHT_LOG_URL.to_string(),
            report_time: "20:00".to_string(),
            aircraft: AircraftRates::new(),
        }
    }
}

impl MaintenanceConfig {
    pub fn is_enabled(&self) -> bool {
        !self.aircraft.is_empty()
    }
}
