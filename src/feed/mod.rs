//! Inbound market feed: websocket transport and message validation.

pub mod parser;
pub mod ws;

pub use parser::{parse, parse_event, Parsed, SkipReason};
pub use ws::TradeFeed;
