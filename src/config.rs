//! Runtime configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default signal log path, relative to the working directory
pub const DEFAULT_LOG_PATH: &str = "signals_log.csv";

/// Default pause between dashboard cycles
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Heartbeat cadence for the SSE status event
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Capacity of the SSE broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for the polling loop
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub log_path: PathBuf,
    pub poll_interval: Duration,
    /// Initial state of the alert-sound toggle
    pub alert_sound: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            alert_sound: true,
        }
    }
}

impl PollerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let log_path = std::env::var("SIGNAL_LOG_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_path);

        let poll_interval = match std::env::var("POLL_INTERVAL_SECS") {
            Ok(raw) => Duration::from_secs(parse_interval(&raw)?),
            Err(_) => defaults.poll_interval,
        };

        let alert_sound = std::env::var("ALERT_SOUND")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.alert_sound);

        Ok(Self {
            log_path,
            poll_interval,
            alert_sound,
        })
    }
}

fn parse_interval(raw: &str) -> Result<u64, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
        ConfigError::Invalid {
            key: "POLL_INTERVAL_SECS",
            value: raw.to_string(),
            reason: e.to_string(),
        }
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key: "POLL_INTERVAL_SECS",
            value: raw.to_string(),
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(secs)
}

/// `1`/`true`/`yes`/`on` are true, anything else false.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.log_path, PathBuf::from("signals_log.csv"));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(config.alert_sound);
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("10").unwrap(), 10);
        assert_eq!(parse_interval(" 2 ").unwrap(), 2);
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
    }
}
