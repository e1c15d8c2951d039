//! Application configuration: TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::envelope::Router;
use crate::listener::ListenerConfig;
use crate::reconnect::RetryPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub ring: RingConfig,
}

/// Broker connection settings, handed to the transport as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Queries for the current color.
    #[serde(default = "default_get_color_topic")]
    pub get_color: String,
    /// Color set/fade commands.
    #[serde(default = "default_set_color_topic")]
    pub set_color: String,
    /// Outbound status.
    #[serde(default = "default_status_topic")]
    pub status: String,
}

/// Loop cadences and connection timings, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_post_enqueue_yield_ms")]
    pub post_enqueue_yield_ms: u64,
    #[serde(default = "default_fast_interval_ms")]
    pub fast_interval_ms: u64,
    #[serde(default = "default_slow_interval_ms")]
    pub slow_interval_ms: u64,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_max_connect_attempts")]
    pub max_connect_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingConfig {
    #[serde(default = "default_pixel_count")]
    pub pixel_count: usize,
    /// Color shown after initialization (hex or name).
    #[serde(default = "default_initial_color")]
    pub initial_color: String,
}

fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "neoring".into()
}
fn default_get_color_topic() -> String {
    "neoring/get-color".into()
}
fn default_set_color_topic() -> String {
    "neoring/set-color".into()
}
fn default_status_topic() -> String {
    "neoring/status".into()
}
fn default_read_timeout_ms() -> u64 {
    2000
}
fn default_post_enqueue_yield_ms() -> u64 {
    250
}
fn default_fast_interval_ms() -> u64 {
    250
}
fn default_slow_interval_ms() -> u64 {
    50
}
fn default_retry_backoff_ms() -> u64 {
    5000
}
fn default_settle_ms() -> u64 {
    250
}
fn default_max_connect_attempts() -> u32 {
    3
}
fn default_pixel_count() -> usize {
    16
}
fn default_initial_color() -> String {
    "#000000".into()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        TopicConfig {
            get_color: default_get_color_topic(),
            set_color: default_set_color_topic(),
            status: default_status_topic(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            read_timeout_ms: default_read_timeout_ms(),
            post_enqueue_yield_ms: default_post_enqueue_yield_ms(),
            fast_interval_ms: default_fast_interval_ms(),
            slow_interval_ms: default_slow_interval_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            settle_ms: default_settle_ms(),
            max_connect_attempts: default_max_connect_attempts(),
        }
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        RingConfig {
            pixel_count: default_pixel_count(),
            initial_color: default_initial_color(),
        }
    }
}

impl TopicConfig {
    /// Router over the two inbound topics.
    pub fn router(&self) -> Router {
        Router::new(self.get_color.clone(), self.set_color.clone())
    }
}

impl TimingConfig {
    pub fn fast_interval(&self) -> Duration {
        Duration::from_millis(self.fast_interval_ms)
    }

    pub fn slow_interval(&self) -> Duration {
        Duration::from_millis(self.slow_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_connect_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    pub fn listener(&self) -> ListenerConfig {
        ListenerConfig {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            post_enqueue_yield: Duration::from_millis(self.post_enqueue_yield_ms),
            retry: self.retry_policy(),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A topic is empty or whitespace-only (`field` names which one).
    EmptyTopic { field: &'static str },
    /// Two topics share the same name.
    DuplicateTopic(String),
    /// `max_connect_attempts` is zero.
    NoConnectAttempts,
    /// `read_timeout_ms` is zero.
    ZeroReadTimeout,
    /// `ring.initial_color` could not be parsed.
    InvalidColor(String),
    /// `ring.pixel_count` is zero.
    NoPixels,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyTopic { field } => write!(f, "Topic {field} cannot be empty"),
            ValidationError::DuplicateTopic(t) => write!(f, "Topic {t} is used more than once"),
            ValidationError::NoConnectAttempts => {
                write!(f, "max_connect_attempts must be at least 1")
            }
            ValidationError::ZeroReadTimeout => write!(f, "read_timeout_ms must be at least 1"),
            ValidationError::InvalidColor(e) => write!(f, "Invalid initial color: {e}"),
            ValidationError::NoPixels => write!(f, "pixel_count must be at least 1"),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("neoring"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let topics = [
            ("get_color", &self.topics.get_color),
            ("set_color", &self.topics.set_color),
            ("status", &self.topics.status),
        ];
        for (field, topic) in topics {
            if topic.trim().is_empty() {
                errors.push(ValidationError::EmptyTopic { field });
            }
        }
        for (i, (_, a)) in topics.iter().enumerate() {
            let dup = topics[i + 1..].iter().any(|(_, b)| a == b);
            if dup && !a.trim().is_empty() {
                errors.push(ValidationError::DuplicateTopic(a.to_string()));
            }
        }

        if self.timing.max_connect_attempts == 0 {
            errors.push(ValidationError::NoConnectAttempts);
        }
        if self.timing.read_timeout_ms == 0 {
            errors.push(ValidationError::ZeroReadTimeout);
        }

        if let Err(e) = crate::led::parse_color(&self.ring.initial_color) {
            errors.push(ValidationError::InvalidColor(e.to_string()));
        }
        if self.ring.pixel_count == 0 {
            errors.push(ValidationError::NoPixels);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The parsed initial ring color, falling back to off.
    pub fn initial_color(&self) -> crate::led::Rgb {
        crate::led::parse_color(&self.ring.initial_color).unwrap_or_else(|e| {
            log::warn!("[config] {e}, using off");
            crate::led::Rgb::OFF
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Config defaults ──

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.topics.get_color, "neoring/get-color");
        assert_eq!(c.topics.set_color, "neoring/set-color");
        assert_eq!(c.topics.status, "neoring/status");
        assert_eq!(c.timing.read_timeout_ms, 2000);
        assert_eq!(c.timing.fast_interval_ms, 250);
        assert_eq!(c.timing.slow_interval_ms, 50);
        assert_eq!(c.timing.max_connect_attempts, 3);
        assert_eq!(c.broker.port, 1883);
        assert_eq!(c.ring.pixel_count, 16);
    }

    #[test]
    fn default_retry_policy_matches_reconnect_defaults() {
        assert_eq!(Config::default().timing.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn serialize_roundtrip() {
        let mut c = Config::default();
        c.topics.status = "lab/ring/status".into();
        c.timing.slow_interval_ms = 10;
        c.broker.host = "broker.lan".into();
        let toml_str = toml::to_string_pretty(&c).unwrap();
        let c2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = "[topics]\nstatus = \"x/status\"\n\n[timing]\nsettle_ms = 5\n";
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.topics.status, "x/status");
        assert_eq!(c.topics.get_color, "neoring/get-color");
        assert_eq!(c.timing.settle_ms, 5);
        assert_eq!(c.timing.retry_backoff_ms, 5000);
        assert_eq!(c.broker, BrokerConfig::default());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn wrong_type_toml_is_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[timing]\nsettle_ms = \"soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn config_path_ends_with_toml() {
        if let Some(path) = Config::path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
            assert_eq!(path.parent().unwrap().file_name().unwrap(), "neoring");
        }
    }

    // ── load_from ──

    #[test]
    fn load_from_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (c, warnings) = Config::load_from(&dir.path().join("nope.toml"));
        assert_eq!(c, Config::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn load_from_malformed_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert_eq!(c, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"));
    }

    #[test]
    fn load_from_reads_every_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut c = Config::default();
        c.ring.initial_color = "blue".into();
        c.broker.host = "broker.lan".into();
        c.timing.settle_ms = 7;
        std::fs::write(&path, toml::to_string_pretty(&c).unwrap()).unwrap();

        let (loaded, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(loaded, c);
        // Loading never writes back.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    // ── validate ──

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_empty_topic() {
        let mut c = Config::default();
        c.topics.get_color = "  ".into();
        let errs = c.validate().unwrap_err();
        assert_eq!(errs, vec![ValidationError::EmptyTopic { field: "get_color" }]);
    }

    #[test]
    fn validate_duplicate_topic() {
        let mut c = Config::default();
        c.topics.status = c.topics.set_color.clone();
        let errs = c.validate().unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::DuplicateTopic("neoring/set-color".into())]
        );
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut c = Config::default();
        c.timing.max_connect_attempts = 0;
        c.timing.read_timeout_ms = 0;
        c.ring.initial_color = "chartreuse".into();
        c.ring.pixel_count = 0;
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 4);
        assert!(errs.contains(&ValidationError::NoConnectAttempts));
        assert!(errs.contains(&ValidationError::ZeroReadTimeout));
        assert!(errs.contains(&ValidationError::NoPixels));
        assert!(matches!(errs[2], ValidationError::InvalidColor(_)));
    }

    #[test]
    fn validation_error_display() {
        assert_eq!(
            ValidationError::EmptyTopic { field: "status" }.to_string(),
            "Topic status cannot be empty"
        );
        assert_eq!(
            ValidationError::NoConnectAttempts.to_string(),
            "max_connect_attempts must be at least 1"
        );
    }

    #[test]
    fn initial_color_parses_names_and_falls_back() {
        let mut c = Config::default();
        c.ring.initial_color = "red".into();
        assert_eq!(c.initial_color(), crate::led::Rgb::new(255, 0, 0));
        c.ring.initial_color = "nope".into();
        assert_eq!(c.initial_color(), crate::led::Rgb::OFF);
    }

    #[test]
    fn topics_build_router() {
        let c = Config::default();
        let router = c.topics.router();
        assert_eq!(router.topics(), ["neoring/get-color", "neoring/set-color"]);
    }

    #[test]
    fn timing_converts_to_durations() {
        let mut c = Config::default();
        c.timing.read_timeout_ms = 40;
        c.timing.post_enqueue_yield_ms = 3;
        let l = c.timing.listener();
        assert_eq!(l.read_timeout, Duration::from_millis(40));
        assert_eq!(l.post_enqueue_yield, Duration::from_millis(3));
        assert_eq!(l.retry.backoff, Duration::from_millis(5000));
        assert_eq!(c.timing.slow_interval(), Duration::from_millis(50));
    }
}
