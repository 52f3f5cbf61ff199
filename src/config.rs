use crate::error::{AppError, Result};

/// Raw feed ids are left-padded to this many digits before deriving a match id.
pub const ID_PAD_WIDTH: usize = 10;

/// Multiplier for the last identifier segment.
pub const ID_PRIME: u128 = 7919;

/// Third identifier segment. Marks the value as belonging to the v4 layout family.
pub const ID_VERSION_SEGMENT: &str = "4000";

/// Team names are truncated to this many characters for narrow layouts.
pub const SHORT_NAME_LEN: usize = 8;

/// Maximum number of matches on one slip that may carry two selections.
pub const MAX_DOUBLE_SELECTIONS: usize = 4;

/// Upper bound on a single retry wait.
pub const MAX_RETRY_DELAY_SECS: u64 = 60;

/// Newest-first diagnostics records kept in memory.
pub const ERROR_LOG_CAPACITY: usize = 1000;

/// Label written into failure records for where synced data goes.
pub const SYNC_DESTINATION: &str = "sqlite";

/// Match status written for fixtures that vanished from the feed.
pub const CANCELLED_STATUS: &str = "Cancelled";

/// Default passthrough status values when the feed omits them.
pub const DEFAULT_MATCH_STATUS: &str = "NotStarted";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Seeds the api_config row on first start when set (FEED_URL).
    pub feed_url: Option<String>,
    /// Periodic sync interval, 0 disables the scheduler (SYNC_INTERVAL_SECS).
    pub sync_interval_secs: u64,
    /// reqwest client timeout for feed fetches (HTTP_TIMEOUT_SECS).
    pub http_timeout_secs: u64,
    pub retry: RetryConfig,
    /// Profiles promoted to admin at startup (comma-separated ADMIN_USER_IDS).
    pub admin_user_ids: Vec<String>,
}

/// Backoff settings for the fetch retry wrapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = RetryConfig::default();
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "pools.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            feed_url: std::env::var("FEED_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            sync_interval_secs: std::env::var("SYNC_INTERVAL_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse::<u64>()
                .unwrap_or(0),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .unwrap_or(30),
            retry: RetryConfig {
                max_attempts: std::env::var("RETRY_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.max_attempts),
                base_delay_ms: std::env::var("RETRY_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(defaults.base_delay_ms),
                backoff_factor: std::env::var("RETRY_BACKOFF_FACTOR")
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|f| f.is_finite() && *f >= 1.0)
                    .unwrap_or(defaults.backoff_factor),
            },
            admin_user_ids: std::env::var("ADMIN_USER_IDS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}
