use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::scoring::AnomalyScore;

/// A validated trade from the feed
#[derive(Clone, Debug, PartialEq)]
pub struct TradeEvent {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    pub event_time_ms: i64,
}

/// One scored trade, in the exact shape the sink expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrade {
    /// ISO-8601, millisecond precision, UTC
    pub timestamp: String,
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    pub anomaly_score: f64,

    /// Sent as 0 / 1
    #[serde(serialize_with = "bool_as_int", deserialize_with = "int_as_bool")]
    pub is_anomaly: bool,
}

/// Scored trades drained together in one flush, in arrival order.
pub type Batch = Vec<ScoredTrade>;

impl ScoredTrade {
    pub fn from_event(event: &TradeEvent, score: AnomalyScore) -> Self {
        Self {
            timestamp: iso_millis(event.event_time_ms),
            symbol: event.symbol.clone(),
            price: event.price,
            quantity: event.quantity,
            anomaly_score: score.score,
            is_anomaly: score.is_anomaly,
        }
    }
}

/// Formats epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso_millis(epoch_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(epoch_ms) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        // Out of chrono's range; the parser rejects these long before here.
        None => epoch_ms.to_string(),
    }
}

fn bool_as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

fn int_as_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match u8::deserialize(deserializer)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "is_anomaly must be 0 or 1, got {other}"
        ))),
    }
}
