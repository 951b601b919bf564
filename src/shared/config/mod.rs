//! Sync configuration module
//!
//! Provides the tunables of the synchronization core: polling cadence,
//! failure notice throttling and feed fetch fan-out.
//!
//! Values come from the builder, from `CINESYNC_*` environment variables, or
//! from a TOML document. Anything left unset keeps its default.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default interval between two conversation polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default minimum gap between two notices for the same failure streak
pub const DEFAULT_NOTICE_INTERVAL: Duration = Duration::from_secs(60);
/// Default number of author fetches in flight during feed aggregation
pub const DEFAULT_FEED_CONCURRENCY: usize = 8;

const ENV_POLL_INTERVAL_MS: &str = "CINESYNC_POLL_INTERVAL_MS";
const ENV_NOTICE_INTERVAL_MS: &str = "CINESYNC_NOTICE_INTERVAL_MS";
const ENV_FEED_CONCURRENCY: &str = "CINESYNC_FEED_CONCURRENCY";
const ENV_STRICT_FEED: &str = "CINESYNC_STRICT_FEED";

/// Synchronization core configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Interval between two polls of the live conversation
    pub poll_interval: Duration,
    /// Minimum gap between two notices while polling keeps failing
    pub failure_notice_interval: Duration,
    /// Maximum author fetches in flight while building a feed
    pub feed_fetch_concurrency: usize,
    /// Fail the whole feed when any author fetch fails
    pub strict_feed: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_notice_interval: DEFAULT_NOTICE_INTERVAL,
            feed_fetch_concurrency: DEFAULT_FEED_CONCURRENCY,
            strict_feed: false,
        }
    }
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.failure_notice_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "failure_notice_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.feed_fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "feed_fetch_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from `CINESYNC_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            builder = builder.poll_interval(Duration::from_millis(parse_env(ENV_POLL_INTERVAL_MS, &raw)?));
        }
        if let Some(raw) = lookup(ENV_NOTICE_INTERVAL_MS) {
            builder = builder.failure_notice_interval(Duration::from_millis(parse_env(
                ENV_NOTICE_INTERVAL_MS,
                &raw,
            )?));
        }
        if let Some(raw) = lookup(ENV_FEED_CONCURRENCY) {
            builder = builder.feed_fetch_concurrency(parse_env(ENV_FEED_CONCURRENCY, &raw)?);
        }
        if let Some(raw) = lookup(ENV_STRICT_FEED) {
            builder = builder.strict_feed(parse_flag(&raw)?);
        }
        builder.build()
    }

    /// Parse a TOML document such as:
    ///
    /// ```toml
    /// poll_interval_ms = 5000
    /// strict_feed = true
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: SyncConfigFile =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut builder = Self::builder();
        if let Some(ms) = file.poll_interval_ms {
            builder = builder.poll_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = file.failure_notice_interval_ms {
            builder = builder.failure_notice_interval(Duration::from_millis(ms));
        }
        if let Some(n) = file.feed_fetch_concurrency {
            builder = builder.feed_fetch_concurrency(n);
        }
        if let Some(strict) = file.strict_feed {
            builder = builder.strict_feed(strict);
        }
        builder.build()
    }
}

/// On-disk shape of the configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyncConfigFile {
    poll_interval_ms: Option<u64>,
    failure_notice_interval_ms: Option<u64>,
    feed_fetch_concurrency: Option<usize>,
    strict_feed: Option<bool>,
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    poll_interval: Option<Duration>,
    failure_notice_interval: Option<Duration>,
    feed_fetch_concurrency: Option<usize>,
    strict_feed: Option<bool>,
}

impl SyncConfigBuilder {
    /// Set the conversation polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Set the minimum gap between polling failure notices
    pub fn failure_notice_interval(mut self, interval: Duration) -> Self {
        self.failure_notice_interval = Some(interval);
        self
    }

    /// Set the number of concurrent author fetches
    pub fn feed_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.feed_fetch_concurrency = Some(concurrency);
        self
    }

    /// Make feed aggregation fail on any author fetch failure
    pub fn strict_feed(mut self, strict: bool) -> Self {
        self.strict_feed = Some(strict);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let config = SyncConfig {
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            failure_notice_interval: self
                .failure_notice_interval
                .unwrap_or(defaults.failure_notice_interval),
            feed_fetch_concurrency: self
                .feed_fetch_concurrency
                .unwrap_or(defaults.feed_fetch_concurrency),
            strict_feed: self.strict_feed.unwrap_or(defaults.strict_feed),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("malformed environment variable {key}: {value:?}")]
    MalformedEnv { key: &'static str, value: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::MalformedEnv {
        key,
        value: raw.to_string(),
    })
}

fn parse_flag(raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::MalformedEnv {
            key: ENV_STRICT_FEED,
            value: raw.to_string(),
        }),
    }
}
