//! Configuration management for the bridge.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default delivery endpoint (the local mock receiver).
pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:8000/receive_telemetry";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default number of failed attempts tolerated before a record is dropped.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default pause between drain cycles after a failed attempt.
pub const DEFAULT_RETRY_DELAY_SECONDS: f64 = 5.0;

/// Default per-request timeout for the sink.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: f64 = 5.0;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_RETRY_DELAY_SECONDS: f64 = 300.0;

/// Pacing strategy applied between drain cycles after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Always wait `retry_delay_seconds`.
    #[default]
    Fixed,
    /// Double the delay per consecutive failure, capped at `max_retry_delay_seconds`.
    Exponential,
}

impl BackoffKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "exponential" => Some(Self::Exponential),
            _ => None,
        }
    }
}

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Delivery target for event packets.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    /// Failed attempts tolerated before a record is dropped.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pause after a failed attempt before the next drain cycle.
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: f64,
    /// Timeout for a single delivery attempt.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: f64,
    /// Queue database file. Defaults to `<base_dir>/bridge_buffer.db`.
    #[serde(default)]
    pub storage_location: Option<PathBuf>,
    /// Audit log file. Defaults to `<base_dir>/integration_log.jsonl`.
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
    /// Structured event stream file. Defaults to `<base_dir>/event_stream.jsonl`.
    #[serde(default)]
    pub event_stream_path: Option<PathBuf>,
    /// Idle time between service loop iterations once the queue is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pacing strategy after failures.
    #[serde(default)]
    pub backoff: BackoffKind,
    /// Upper bound for exponential pacing.
    #[serde(default = "default_max_retry_delay_seconds")]
    pub max_retry_delay_seconds: f64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay_seconds() -> f64 {
    DEFAULT_RETRY_DELAY_SECONDS
}

fn default_request_timeout_seconds() -> f64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_max_retry_delay_seconds() -> f64 {
    DEFAULT_MAX_RETRY_DELAY_SECONDS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            endpoint_url: default_endpoint_url(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_seconds: DEFAULT_RETRY_DELAY_SECONDS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            storage_location: None,
            audit_log_path: None,
            event_stream_path: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            backoff: BackoffKind::Fixed,
            max_retry_delay_seconds: DEFAULT_MAX_RETRY_DELAY_SECONDS,
        }
    }
}

impl Config {
    /// Load configuration from `paths.config_file()` if present, then apply
    /// environment overrides and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `paths.config_file()`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) -> CoreResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `BRIDGE_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("BRIDGE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = lookup("BRIDGE_ENDPOINT_URL") {
            self.endpoint_url = url;
        }
        if let Some(raw) = lookup("BRIDGE_MAX_RETRIES") {
            self.max_retries = parse_env("BRIDGE_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("BRIDGE_RETRY_DELAY_SECONDS") {
            self.retry_delay_seconds = parse_env("BRIDGE_RETRY_DELAY_SECONDS", &raw)?;
        }
        if let Some(raw) = lookup("BRIDGE_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = parse_env("BRIDGE_REQUEST_TIMEOUT_SECONDS", &raw)?;
        }
        if let Some(path) = lookup("BRIDGE_STORAGE_LOCATION") {
            self.storage_location = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("BRIDGE_BACKOFF") {
            self.backoff = BackoffKind::parse(&raw).ok_or_else(|| {
                CoreError::Config(format!("BRIDGE_BACKOFF: unknown strategy '{}'", raw))
            })?;
        }
        Ok(())
    }

    /// Check value ranges and that the endpoint is a valid URL.
    pub fn validate(&self) -> CoreResult<()> {
        self.endpoint_url()?;

        check_seconds("retry_delay_seconds", self.retry_delay_seconds)?;
        check_seconds("request_timeout_seconds", self.request_timeout_seconds)?;
        check_seconds("max_retry_delay_seconds", self.max_retry_delay_seconds)?;

        if self.request_timeout_seconds == 0.0 {
            return Err(CoreError::Config(
                "request_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the endpoint as a parsed URL.
    pub fn endpoint_url(&self) -> CoreResult<Url> {
        Url::parse(&self.endpoint_url).map_err(CoreError::from)
    }

    pub fn retry_delay(&self) -> Duration {
        seconds(self.retry_delay_seconds)
    }

    pub fn max_retry_delay(&self) -> Duration {
        seconds(self.max_retry_delay_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolved queue database location.
    pub fn storage_location(&self, paths: &Paths) -> PathBuf {
        self.storage_location
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }

    /// Resolved audit log location.
    pub fn audit_log_path(&self, paths: &Paths) -> PathBuf {
        self.audit_log_path
            .clone()
            .unwrap_or_else(|| paths.audit_log_file())
    }

    /// Resolved event stream location.
    pub fn event_stream_path(&self, paths: &Paths) -> PathBuf {
        self.event_stream_path
            .clone()
            .unwrap_or_else(|| paths.event_stream_file())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> CoreResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| CoreError::Config(format!("{}: invalid value '{}'", name, raw)))
}

fn check_seconds(name: &str, value: f64) -> CoreResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::Config(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )));
    }
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(CoreError::Config(format!(
            "{} is too large to represent as a duration, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Lenient conversion for fields that skipped `validate()`: negative or NaN
/// becomes zero, overflow saturates.
fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.backoff, BackoffKind::Fixed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(
            &config_path,
            r#"{
                "endpoint_url": "https://sink.example.com/ingest",
                "max_retries": 2,
                "retry_delay_seconds": 0.5,
                "backoff": "exponential"
            }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.endpoint_url, "https://sink.example.com/ingest");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.backoff, BackoffKind::Exponential);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.request_timeout_seconds, DEFAULT_REQUEST_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            log_level: "trace".to_string(),
            max_retries: 9,
            ..Default::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.log_level, "trace");
        assert_eq!(loaded.max_retries, 9);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.storage_location(&paths), paths.database_file());
        assert_eq!(config.audit_log_path(&paths), paths.audit_log_file());
        assert_eq!(config.event_stream_path(&paths), paths.event_stream_file());
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                ("BRIDGE_ENDPOINT_URL", "http://sink.local/events"),
                ("BRIDGE_MAX_RETRIES", "0"),
                ("BRIDGE_RETRY_DELAY_SECONDS", "1.5"),
                ("BRIDGE_STORAGE_LOCATION", "/var/lib/bridge/queue.db"),
                ("BRIDGE_BACKOFF", "Exponential"),
            ]))
            .unwrap();

        assert_eq!(config.endpoint_url, "http://sink.local/events");
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.retry_delay(), Duration::from_millis(1500));
        assert_eq!(
            config.storage_location,
            Some(PathBuf::from("/var/lib/bridge/queue.db"))
        );
        assert_eq!(config.backoff, BackoffKind::Exponential);
    }

    #[test]
    fn test_overrides_reject_garbage() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup_from(&[("BRIDGE_MAX_RETRIES", "-1")]));
        assert!(matches!(result, Err(CoreError::Config(_))));

        let result = config.apply_overrides(lookup_from(&[("BRIDGE_BACKOFF", "jittered")]));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            endpoint_url: "not a valid url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidUrl(_))));

        let config = Config {
            retry_delay_seconds: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = Config {
            request_timeout_seconds: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = Config {
            max_retry_delay_seconds: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unrepresentable_durations() {
        let config = Config {
            retry_delay_seconds: 1e30,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
        assert_eq!(config.retry_delay(), Duration::MAX);

        let config = Config {
            request_timeout_seconds: f64::MAX,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_retry_delay_seconds: 1e20,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_too_large_fails_load_validation() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[("BRIDGE_RETRY_DELAY_SECONDS", "1e30")]))
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_helpers_never_panic() {
        let config = Config {
            retry_delay_seconds: -3.0,
            request_timeout_seconds: f64::NAN,
            max_retry_delay_seconds: f64::INFINITY,
            ..Config::default()
        };
        assert_eq!(config.retry_delay(), Duration::ZERO);
        assert_eq!(config.request_timeout(), Duration::ZERO);
        assert_eq!(config.max_retry_delay(), Duration::MAX);
    }

    #[test]
    fn test_zero_retry_delay_is_valid() {
        let config = Config {
            retry_delay_seconds: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_delay(), Duration::ZERO);
    }
}
