use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use std::{env, fs};
use tracing::info;
use url::Url;

use crate::constants::{batching, feed, model};
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            symbols: default_symbols(),
            event_type: default_event_type(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl FeedConfig {
    /// Stream names in Binance form, e.g. `btcusdt@trade`.
    pub fn channels(&self) -> Vec<String> {
        self.symbols
            .iter()
            .map(|s| format!("{}@{}", s.to_lowercase(), self.event_type))
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SinkConfig {
    /// Push endpoint. Without one, batches are only logged.
    pub url: Option<String>,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    #[serde(default = "default_sink_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: default_sink_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            contamination: default_contamination(),
            seed: default_seed(),
            max_samples: default_max_samples(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: f64,
    #[serde(default = "default_pending_warn_threshold")]
    pub pending_warn_threshold: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            pending_warn_threshold: default_pending_warn_threshold(),
            log_level: default_log_level(),
            feed: FeedConfig::default(),
            sink: SinkConfig::default(),
            model: ModelConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `CONFIG_PATH` (or `config.yaml`), applies env overrides and
    /// validates the result. A missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SINK_PUSH_URL") {
            self.sink.url = Some(url);
        }
        if let Some(key) = lookup("SINK_API_KEY") {
            self.sink.api_key = Some(key);
        }
        if let Some(url) = lookup("FEED_URL") {
            self.feed.url = url;
        }
        if let Some(secs) = lookup("FLUSH_INTERVAL_SECS") {
            self.flush_interval_secs = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("FLUSH_INTERVAL_SECS is not a number: {secs}")))?;
        }
        if let Some(port) = lookup("API_PORT") {
            let port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("API_PORT is not a port: {port}")))?;
            self.api.port = Some(port);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = Duration::try_from_secs_f64(self.flush_interval_secs).ok();
        if !interval.is_some_and(|d| (batching::MIN_FLUSH_INTERVAL..=batching::MAX_FLUSH_INTERVAL).contains(&d)) {
            return Err(ConfigError::Invalid(format!(
                "flush_interval_secs must be between {:?} and {:?}, got {}",
                batching::MIN_FLUSH_INTERVAL,
                batching::MAX_FLUSH_INTERVAL,
                self.flush_interval_secs
            )));
        }

        let feed_url = Url::parse(&self.feed.url).map_err(|source| ConfigError::Url { field: "feed.url", source })?;
        if !matches!(feed_url.scheme(), "ws" | "wss") {
            return Err(ConfigError::Invalid(format!("feed.url must be ws:// or wss://, got {}", self.feed.url)));
        }
        if self.feed.symbols.is_empty() {
            return Err(ConfigError::Invalid("feed.symbols must not be empty".to_string()));
        }
        if self.feed.event_type.trim().is_empty() {
            return Err(ConfigError::Invalid("feed.event_type must not be empty".to_string()));
        }

        if let Some(url) = &self.sink.url {
            let sink_url = Url::parse(url).map_err(|source| ConfigError::Url { field: "sink.url", source })?;
            if !matches!(sink_url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!("sink.url must be http(s), got {url}")));
            }
        }

        if !(self.model.contamination > 0.0 && self.model.contamination <= 0.5) {
            return Err(ConfigError::Invalid(format!(
                "model.contamination must be in (0, 0.5], got {}",
                self.model.contamination
            )));
        }
        if self.model.n_estimators == 0 {
            return Err(ConfigError::Invalid("model.n_estimators must be at least 1".to_string()));
        }
        if self.model.max_samples < 2 {
            return Err(ConfigError::Invalid("model.max_samples must be at least 2".to_string()));
        }
        Ok(())
    }

    /// Flush period, clamped to the accepted range so an unvalidated
    /// config cannot yield a zero or unrepresentable period.
    pub fn flush_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.flush_interval_secs)
            .unwrap_or(batching::MAX_FLUSH_INTERVAL)
            .clamp(batching::MIN_FLUSH_INTERVAL, batching::MAX_FLUSH_INTERVAL)
    }
}

fn default_flush_interval_secs() -> f64 {
    batching::DEFAULT_FLUSH_INTERVAL_SECS
}

fn default_pending_warn_threshold() -> usize {
    batching::DEFAULT_PENDING_WARN_THRESHOLD
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_feed_url() -> String {
    feed::DEFAULT_URL.to_string()
}

fn default_symbols() -> Vec<String> {
    feed::DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn default_event_type() -> String {
    feed::TRADE_EVENT_TYPE.to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    feed::DEFAULT_RECONNECT_DELAY_SECS
}

fn default_sink_timeout_secs() -> u64 {
    batching::DEFAULT_SINK_TIMEOUT_SECS
}

fn default_n_estimators() -> usize {
    model::DEFAULT_N_ESTIMATORS
}

fn default_contamination() -> f64 {
    model::DEFAULT_CONTAMINATION
}

fn default_seed() -> u64 {
    model::DEFAULT_SEED
}

fn default_max_samples() -> usize {
    model::DEFAULT_MAX_SAMPLES
}
