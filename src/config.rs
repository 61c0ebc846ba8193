//! Environment configuration.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `QUADRANT_FEED_URL` | Base URL of the task document service | required unless replaying |
//! | `QUADRANT_FEED_TOKEN` | Bearer token for the service | none |
//! | `QUADRANT_OWNER` | Uid the CLI acts for | required |
//! | `QUADRANT_POLL_INTERVAL_MS` | Poll instead of streaming | stream |
//! | `QUADRANT_WEEK_START` | `sunday` or `monday` | `sunday` |
//! | `QUADRANT_SNAPSHOT_TIMEOUT_MS` | Wait for the first snapshot | `10000` |
//! | `QUADRANT_RECORD` | Record feed traffic to this cassette | off |
//! | `QUADRANT_REPLAY` | Serve feed traffic from this cassette | off |
//! | `QUADRANT_LOG` | `tracing` filter directives | `info` |
//! | `QUADRANT_LOG_FORMAT` | `text` or `json` | `text` |

use std::path::PathBuf;
use std::time::Duration;

use chrono::Weekday;

use crate::error::ConfigError;
use crate::logging::LogFormat;

/// Default wait for the first snapshot.
pub const DEFAULT_SNAPSHOT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the task document service.
    pub feed_url: Option<String>,
    /// Bearer token for the service.
    pub feed_token: Option<String>,
    /// Uid the CLI acts for.
    pub owner: Option<String>,
    /// Poll interval; `None` uses the streaming subscription.
    pub poll_interval: Option<Duration>,
    /// First day of the week.
    pub week_start: Weekday,
    /// How long commands wait for the first snapshot.
    pub snapshot_timeout: Duration,
    /// Cassette to record into.
    pub record: Option<PathBuf>,
    /// Cassette to replay from.
    pub replay: Option<PathBuf>,
    /// Log filter directives.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            feed_token: None,
            owner: None,
            poll_interval: None,
            week_start: Weekday::Sun,
            snapshot_timeout: DEFAULT_SNAPSHOT_TIMEOUT,
            record: None,
            replay: None,
            log_filter: None,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for values that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for values that cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let poll_interval = get("QUADRANT_POLL_INTERVAL_MS")
            .map(|raw| parse_millis("QUADRANT_POLL_INTERVAL_MS", &raw))
            .transpose()?;
        let snapshot_timeout = get("QUADRANT_SNAPSHOT_TIMEOUT_MS")
            .map(|raw| parse_millis("QUADRANT_SNAPSHOT_TIMEOUT_MS", &raw))
            .transpose()?
            .unwrap_or(DEFAULT_SNAPSHOT_TIMEOUT);
        let week_start = get("QUADRANT_WEEK_START")
            .map(|raw| parse_week_start(&raw))
            .transpose()?
            .unwrap_or(Weekday::Sun);
        let log_format = get("QUADRANT_LOG_FORMAT")
            .map(|raw| {
                raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "QUADRANT_LOG_FORMAT",
                    value: raw.clone(),
                    reason: "expected text or json",
                })
            })
            .transpose()?
            .unwrap_or(LogFormat::Text);

        Ok(Self {
            feed_url: get("QUADRANT_FEED_URL"),
            feed_token: get("QUADRANT_FEED_TOKEN"),
            owner: get("QUADRANT_OWNER"),
            poll_interval,
            week_start,
            snapshot_timeout,
            record: get("QUADRANT_RECORD").map(PathBuf::from),
            replay: get("QUADRANT_REPLAY").map(PathBuf::from),
            log_filter: get("QUADRANT_LOG"),
            log_format,
        })
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a positive number of milliseconds",
        }),
    }
}

fn parse_week_start(raw: &str) -> Result<Weekday, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "sunday" | "sun" => Ok(Weekday::Sun),
        "monday" | "mon" => Ok(Weekday::Mon),
        _ => Err(ConfigError::Invalid {
            key: "QUADRANT_WEEK_START",
            value: raw.to_string(),
            reason: "expected sunday or monday",
        }),
    }
}
