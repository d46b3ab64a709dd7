//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use riskguard_enforcer::{AggregateRiskConfig, EventWindowConfig};

use crate::error::{AppError, AppResult};

/// Trading-engine bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Command endpoint of the terminal bridge.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:18650/command".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Durable-state location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory holding the two state records.
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("./state")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

impl StateConfig {
    /// Aggregate enforcement state file.
    #[must_use]
    pub fn limits_path(&self) -> PathBuf {
        self.dir.join("limits.json")
    }

    /// Kill-switch state file.
    #[must_use]
    pub fn kill_switch_path(&self) -> PathBuf {
        self.dir.join("kill_switch.json")
    }
}

/// Calendar feed and cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Upstream feed URL. Unset disables refresh; the cache is still read.
    #[serde(default)]
    pub feed_url: Option<String>,
    /// Local cache file.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Cache entries older than this are treated as absent.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,
    /// How often the cache file is re-read (minutes).
    #[serde(default = "default_reload_minutes")]
    pub reload_minutes: u64,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./state/calendar.json")
}

fn default_max_age_days() -> i64 {
    7
}

fn default_reload_minutes() -> u64 {
    10
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            cache_path: default_cache_path(),
            max_age_days: default_max_age_days(),
            reload_minutes: default_reload_minutes(),
        }
    }
}

/// Control-loop cadence and barriers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Tick interval (seconds).
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    /// Settle window after a re-enable before enforcement resumes
    /// (seconds).
    #[serde(default = "default_reenable_settle_secs")]
    pub reenable_settle_secs: u64,
    /// Poll interval inside the confirmed-closure barrier (seconds).
    #[serde(default = "default_confirm_poll_secs")]
    pub confirm_poll_secs: u64,
    /// Bound on the confirmed-closure barrier (seconds). Unset reproduces
    /// the reference behavior of waiting indefinitely; set, the loop gives
    /// up, reports the leftover tickets and moves on.
    #[serde(default)]
    pub confirm_timeout_secs: Option<u64>,
    /// Delay after a failed tick before the next one (seconds).
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

fn default_poll_secs() -> u64 {
    3
}

fn default_reenable_settle_secs() -> u64 {
    3
}

fn default_confirm_poll_secs() -> u64 {
    1
}

fn default_error_backoff_secs() -> u64 {
    2
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
            reenable_settle_secs: default_reenable_settle_secs(),
            confirm_poll_secs: default_confirm_poll_secs(),
            confirm_timeout_secs: None,
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

/// Telegram notification credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Trading-engine bridge.
    pub engine: EngineConfig,
    /// Aggregate-risk enforcement parameters.
    pub risk: AggregateRiskConfig,
    /// Event-window enforcement parameters.
    pub news: EventWindowConfig,
    /// Calendar feed and cache.
    pub calendar: CalendarConfig,
    /// Durable-state location.
    pub state: StateConfig,
    /// Control-loop cadence.
    pub control: ControlConfig,
    /// Telegram notification sink; absent disables notification.
    pub telegram: Option<TelegramConfig>,
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> AppResult<Self> {
        let config_path = std::env::var("RISKGUARD_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}
