//! Custom error types for the ingestion pipeline
//!
//! Each stage has its own fault type so a skipped message, a bad trade and a
//! failed push can be told apart by callers and tests.

use thiserror::Error;

/// A recognized trade message carried a field that could not be turned into
/// a valid value. The message is dropped, the stream continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeParseError {
    #[error("Field '{field}' is not numeric: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Field '{field}' must be a positive finite number, got {value}")]
    NonPositive { field: &'static str, value: String },

    #[error("Invalid symbol: {value}")]
    InvalidSymbol { value: String },
}

/// Sink push failures. The batch is discarded either way.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Connection-level faults on the inbound feed
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),
}

/// Model fitting errors (startup only)
#[derive(Error, Debug, PartialEq)]
pub enum ScorerError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Contamination must be in (0, 0.5], got {0}")]
    InvalidContamination(f64),

    #[error("At least one estimator is required")]
    NoEstimators,

    #[error("Subsample size must be at least 2, got {0}")]
    InvalidMaxSamples(usize),

    #[error("Training sample {index} has a non-finite value")]
    NonFiniteSample { index: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid URL for {field}: {source}")]
    Url {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level errors. Only startup failures end up here.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scorer(#[from] ScorerError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
