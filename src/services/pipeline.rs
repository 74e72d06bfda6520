//! Producer path: raw message -> parse -> score -> accumulator.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::constants::feed::TRADE_EVENT_TYPE;
use crate::data::accumulator::BatchAccumulator;
use crate::error::TradeParseError;
use crate::events::ScoredTrade;
use crate::feed::parser::{parse_event, Parsed, SkipReason};
use crate::scoring::Scorer;

use super::stats::PipelineStats;

#[derive(Clone, Debug, PartialEq)]
pub enum ProcessOutcome {
    Accepted(ScoredTrade),
    Skipped(SkipReason),
    Faulted(TradeParseError),
}

/// Cheap to clone; every clone feeds the same accumulator.
#[derive(Clone)]
pub struct TradeProcessor {
    scorer: Arc<Scorer>,
    accumulator: Arc<BatchAccumulator>,
    stats: Arc<PipelineStats>,
    event_type: String,
}

impl TradeProcessor {
    pub fn new(scorer: Arc<Scorer>, accumulator: Arc<BatchAccumulator>, stats: Arc<PipelineStats>) -> Self {
        Self {
            scorer,
            accumulator,
            stats,
            event_type: TRADE_EVENT_TYPE.to_string(),
        }
    }

    /// Accept a different `e` tag, e.g. `aggTrade`.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn accumulator(&self) -> &Arc<BatchAccumulator> {
        &self.accumulator
    }

    /// Never fails: skips and faults are counted, logged and dropped.
    pub fn handle_message(&self, raw: &str) -> ProcessOutcome {
        self.stats.record_message();

        let event = match parse_event(raw, &self.event_type) {
            Ok(Parsed::Trade(event)) => event,
            Ok(Parsed::Skip(reason)) => {
                self.stats.record_skip();
                debug!("Skipping message ({:?})", reason);
                return ProcessOutcome::Skipped(reason);
            }
            Err(e) => {
                self.stats.record_fault();
                error!("Error processing trade message: {} | Data: {}", e, raw);
                return ProcessOutcome::Faulted(e);
            }
        };

        let score = self.scorer.score(event.price, event.quantity);
        let record = ScoredTrade::from_event(&event, score);

        info!(
            "TRADE: {} | Price: {:.2} | Qty: {:.4} | ANOMALY: {}",
            record.symbol,
            record.price,
            record.quantity,
            if record.is_anomaly { "YES" } else { "No" }
        );

        self.stats.record_accepted(record.is_anomaly);
        self.accumulator.append(record.clone());
        ProcessOutcome::Accepted(record)
    }
}
