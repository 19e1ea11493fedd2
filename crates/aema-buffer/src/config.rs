//! Buffer configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use aema_client::DEFAULT_CONFIRMATION_ROUNDS;
use aema_core::{AemaError, AemaResult};

use crate::LogFormat;

/// Smallest interval between reconciliation passes
pub const MIN_SLEEP_FLOOR: Duration = Duration::from_millis(1);

/// Buffer configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Pause between reconciliation passes
    #[serde(with = "humantime_str")]
    pub min_sleep: Duration,
    /// Budget for every blocking remote step (one call or one chunk)
    #[serde(with = "humantime_str")]
    pub timeout: Duration,
    /// Rounds to wait for a transaction to confirm
    pub confirmation_rounds: u64,
    /// Reconciliation events buffered before new ones are dropped
    pub event_capacity: usize,
    pub log_format: LogFormat,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            min_sleep: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
            confirmation_rounds: DEFAULT_CONFIRMATION_ROUNDS,
            event_capacity: 16,
            log_format: LogFormat::Compact,
        }
    }
}

impl BufferConfig {
    /// Defaults overlaid with `AEMA_*` environment variables
    pub fn from_env() -> AemaResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> AemaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = BufferConfig::default();

        if let Some(v) = lookup("AEMA_MIN_SLEEP") {
            config.min_sleep = parse_duration("AEMA_MIN_SLEEP", &v)?;
        }
        if let Some(v) = lookup("AEMA_TIMEOUT") {
            config.timeout = parse_duration("AEMA_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("AEMA_CONFIRMATION_ROUNDS") {
            config.confirmation_rounds = parse_number("AEMA_CONFIRMATION_ROUNDS", &v)?;
        }
        if let Some(v) = lookup("AEMA_EVENT_CAPACITY") {
            config.event_capacity = parse_number("AEMA_EVENT_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("AEMA_LOG_FORMAT") {
            config.log_format = v.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AemaResult<()> {
        if self.timeout.is_zero() {
            return Err(AemaError::Config("timeout must be positive".into()));
        }
        if self.confirmation_rounds == 0 {
            return Err(AemaError::Config("confirmation_rounds must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(AemaError::Config("event_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Install the global tracing subscriber in the configured format
    pub fn init_tracing(&self) -> AemaResult<()> {
        crate::init_tracing(self.log_format)
    }

    /// Pass interval, never below `MIN_SLEEP_FLOOR`
    pub fn pass_interval(&self) -> Duration {
        self.min_sleep.max(MIN_SLEEP_FLOOR)
    }
}

fn parse_duration(name: &str, value: &str) -> AemaResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| AemaError::Config(format!("{name}: {e}")))
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> AemaResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AemaError::Config(format!("{name}: {e}")))
}

/// Durations as humantime strings ("5s", "250ms")
mod humantime_str {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
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
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BufferConfig::default();
        assert_eq!(config.min_sleep, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.confirmation_rounds, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overlay() {
        let config = BufferConfig::from_lookup(lookup(&[
            ("AEMA_MIN_SLEEP", "250ms"),
            ("AEMA_TIMEOUT", "2s"),
            ("AEMA_EVENT_CAPACITY", "4"),
            ("AEMA_LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.min_sleep, Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.event_capacity, 4);
        assert_eq!(config.confirmation_rounds, 10);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bad_values_rejected() {
        let err = BufferConfig::from_lookup(lookup(&[("AEMA_TIMEOUT", "soon")])).unwrap_err();
        assert!(matches!(err, AemaError::Config(msg) if msg.starts_with("AEMA_TIMEOUT")));

        assert!(BufferConfig::from_lookup(lookup(&[("AEMA_EVENT_CAPACITY", "0")])).is_err());
        assert!(BufferConfig::from_lookup(lookup(&[("AEMA_LOG_FORMAT", "xml")])).is_err());
    }

    #[test]
    fn test_zero_sleep_is_floored() {
        let config = BufferConfig {
            min_sleep: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.pass_interval(), MIN_SLEEP_FLOOR);
    }

    #[test]
    fn test_init_tracing_from_config() {
        let config = BufferConfig::from_lookup(lookup(&[("AEMA_LOG_FORMAT", "json")])).unwrap();
        let _ = config.init_tracing();
        // A subscriber is installed now, by this call or an earlier test
        assert!(matches!(config.init_tracing(), Err(AemaError::Config(_))));
    }

    #[test]
    fn test_serde_humantime() {
        let json = r#"{"min_sleep":"100ms","timeout":"1m"}"#;
        let config: BufferConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.min_sleep, Duration::from_millis(100));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.event_capacity, 16);

        let out = serde_json::to_string(&config).unwrap();
        assert!(out.contains(r#""timeout":"1m""#));
        assert!(out.contains(r#""log_format":"compact""#));
    }
}
