use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free pipeline counters, shared by the producer and consumer paths.
#[derive(Debug, Default)]
pub struct PipelineStats {
    messages_received: AtomicU64,
    trades_accepted: AtomicU64,
    anomalies_flagged: AtomicU64,
    messages_skipped: AtomicU64,
    processing_faults: AtomicU64,
    batches_delivered: AtomicU64,
    batches_failed: AtomicU64,
    records_delivered: AtomicU64,
    records_discarded: AtomicU64,
    empty_ticks: AtomicU64,
    feed_faults: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub messages_received: u64,
    pub trades_accepted: u64,
    pub anomalies_flagged: u64,
    pub messages_skipped: u64,
    pub processing_faults: u64,
    pub batches_delivered: u64,
    pub batches_failed: u64,
    pub records_delivered: u64,
    pub records_discarded: u64,
    pub empty_ticks: u64,
    pub feed_faults: u64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message(&self) {
        bump(&self.messages_received, 1);
    }

    pub fn record_accepted(&self, is_anomaly: bool) {
        bump(&self.trades_accepted, 1);
        if is_anomaly {
            bump(&self.anomalies_flagged, 1);
        }
    }

    pub fn record_skip(&self) {
        bump(&self.messages_skipped, 1);
    }

    pub fn record_fault(&self) {
        bump(&self.processing_faults, 1);
    }

    pub fn record_delivered(&self, records: usize) {
        bump(&self.batches_delivered, 1);
        bump(&self.records_delivered, records as u64);
    }

    pub fn record_failed(&self, records: usize) {
        bump(&self.batches_failed, 1);
        bump(&self.records_discarded, records as u64);
    }

    pub fn record_empty_tick(&self) {
        bump(&self.empty_ticks, 1);
    }

    pub fn record_feed_fault(&self) {
        bump(&self.feed_faults, 1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            messages_received: load(&self.messages_received),
            trades_accepted: load(&self.trades_accepted),
            anomalies_flagged: load(&self.anomalies_flagged),
            messages_skipped: load(&self.messages_skipped),
            processing_faults: load(&self.processing_faults),
            batches_delivered: load(&self.batches_delivered),
            batches_failed: load(&self.batches_failed),
            records_delivered: load(&self.records_delivered),
            records_discarded: load(&self.records_discarded),
            empty_ticks: load(&self.empty_ticks),
            feed_faults: load(&self.feed_faults),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = PipelineStats::new();
        stats.record_message();
        stats.record_message();
        stats.record_accepted(true);
        stats.record_accepted(false);
        stats.record_skip();
        stats.record_fault();
        stats.record_delivered(3);
        stats.record_failed(2);
        stats.record_empty_tick();

        let snap = stats.snapshot();
        assert_eq!(snap.messages_received, 2);
        assert_eq!(snap.trades_accepted, 2);
        assert_eq!(snap.anomalies_flagged, 1);
        assert_eq!(snap.messages_skipped, 1);
        assert_eq!(snap.processing_faults, 1);
        assert_eq!(snap.batches_delivered, 1);
        assert_eq!(snap.records_delivered, 3);
        assert_eq!(snap.batches_failed, 1);
        assert_eq!(snap.records_discarded, 2);
        assert_eq!(snap.empty_ticks, 1);
        assert_eq!(snap.feed_faults, 0);
    }
}
