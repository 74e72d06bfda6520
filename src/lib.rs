//! Anomaly Stream - real-time trade anomaly scoring
//!
//! Trades arrive over a websocket feed, are scored by an Isolation Forest
//! and buffered; a periodic flush pushes each buffered batch to an HTTP sink.

pub mod api;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod events;
pub mod feed;
pub mod scoring;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use data::accumulator::BatchAccumulator;
pub use events::{Batch, ScoredTrade, TradeEvent};
pub use scoring::{AnomalyScore, Scorer};

#[cfg(test)]
mod events_tests;
