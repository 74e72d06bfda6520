//! Raw feed message -> `TradeEvent`.
//!
//! Anything that is not a trade of the expected type is skipped quietly.
//! A trade with a broken field is a `TradeParseError`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::constants::feed::TRADE_EVENT_TYPE;
use crate::error::TradeParseError;
use crate::events::TradeEvent;

const FIELD_EVENT_TYPE: &str = "e";
const FIELD_SYMBOL: &str = "s";
const FIELD_PRICE: &str = "p";
const FIELD_QUANTITY: &str = "q";
const FIELD_TRADE_TIME: &str = "T";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotJson,
    NotAnObject,
    WrongEventType,
    MissingField(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Parsed {
    Trade(TradeEvent),
    Skip(SkipReason),
}

/// Parses a Binance `trade` message.
pub fn parse(raw: &str) -> Result<Parsed, TradeParseError> {
    parse_event(raw, TRADE_EVENT_TYPE)
}

/// Parses a message whose `e` tag must equal `event_type`.
pub fn parse_event(raw: &str, event_type: &str) -> Result<Parsed, TradeParseError> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return Ok(Parsed::Skip(SkipReason::NotJson)),
    };
    let obj = match value.as_object() {
        Some(o) => o,
        None => return Ok(Parsed::Skip(SkipReason::NotAnObject)),
    };

    if obj.get(FIELD_EVENT_TYPE).and_then(Value::as_str) != Some(event_type) {
        return Ok(Parsed::Skip(SkipReason::WrongEventType));
    }

    // Presence is checked for all fields before any value is interpreted,
    // so an incomplete message is always a skip.
    let required = [FIELD_SYMBOL, FIELD_PRICE, FIELD_QUANTITY, FIELD_TRADE_TIME];
    if let Some(missing) = required.into_iter().find(|name| field(obj, name).is_none()) {
        return Ok(Parsed::Skip(SkipReason::MissingField(missing)));
    }
    let symbol = &obj[FIELD_SYMBOL];
    let price = &obj[FIELD_PRICE];
    let quantity = &obj[FIELD_QUANTITY];
    let trade_time = &obj[FIELD_TRADE_TIME];

    let symbol = match symbol {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        other => return Err(TradeParseError::InvalidSymbol { value: other.to_string() }),
    };
    let price = positive_f64(FIELD_PRICE, price)?;
    let quantity = positive_f64(FIELD_QUANTITY, quantity)?;
    let event_time_ms = epoch_millis(FIELD_TRADE_TIME, trade_time)?;

    Ok(Parsed::Trade(TradeEvent {
        symbol,
        price,
        quantity,
        event_time_ms,
    }))
}

fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

/// Binance sends decimals as strings; plain JSON numbers are accepted too.
fn positive_f64(name: &'static str, value: &Value) -> Result<f64, TradeParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let v = parsed.ok_or_else(|| TradeParseError::InvalidNumber {
        field: name,
        value: display(value),
    })?;
    if !(v.is_finite() && v > 0.0) {
        return Err(TradeParseError::NonPositive {
            field: name,
            value: display(value),
        });
    }
    Ok(v)
}

fn epoch_millis(name: &'static str, value: &Value) -> Result<i64, TradeParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let ms = parsed.ok_or_else(|| TradeParseError::InvalidNumber {
        field: name,
        value: display(value),
    })?;
    if ms <= 0 || DateTime::<Utc>::from_timestamp_millis(ms).is_none() {
        return Err(TradeParseError::NonPositive {
            field: name,
            value: display(value),
        });
    }
    Ok(ms)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
