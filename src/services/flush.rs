//! Consumer path: drain the accumulator on a fixed period and push.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::constants::batching::DEFAULT_PENDING_WARN_THRESHOLD;
use crate::data::accumulator::BatchAccumulator;

use super::dispatch::BatchSink;
use super::stats::PipelineStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing buffered, sink not called
    Empty,
    Delivered(usize),
    /// Pushed and rejected; the records are dropped
    Failed(usize),
}

pub struct FlushScheduler {
    accumulator: Arc<BatchAccumulator>,
    sink: Arc<dyn BatchSink>,
    stats: Arc<PipelineStats>,
    period: Duration,
    warn_threshold: usize,
}

impl FlushScheduler {
    pub fn new(
        accumulator: Arc<BatchAccumulator>,
        sink: Arc<dyn BatchSink>,
        stats: Arc<PipelineStats>,
        period: Duration,
    ) -> Self {
        Self {
            accumulator,
            sink,
            stats,
            period,
            warn_threshold: DEFAULT_PENDING_WARN_THRESHOLD,
        }
    }

    pub fn with_warn_threshold(mut self, threshold: usize) -> Self {
        self.warn_threshold = threshold;
        self
    }

    /// One tick: drain, then push if there is anything to push. The push is
    /// awaited here, so the next drain waits for it.
    pub async fn flush_once(&self) -> FlushOutcome {
        let batch = self.accumulator.drain_all();
        if batch.is_empty() {
            self.stats.record_empty_tick();
            debug!("Flush tick: nothing to send");
            return FlushOutcome::Empty;
        }

        let count = batch.len();
        if count > self.warn_threshold {
            warn!(
                "Batch of {} trades exceeds threshold {}; the sink may be falling behind",
                count, self.warn_threshold
            );
        }

        let batch_id = Uuid::new_v4();
        match self.sink.push(batch).await {
            Ok(()) => {
                self.stats.record_delivered(count);
                info!(
                    "--- Successfully pushed a batch of {} trades to {} sink (batch {}) ---",
                    count,
                    self.sink.name(),
                    batch_id
                );
                FlushOutcome::Delivered(count)
            }
            Err(e) => {
                self.stats.record_failed(count);
                error!(
                    "Error pushing batch {} ({} trades) to {} sink, discarding: {}",
                    batch_id,
                    count,
                    self.sink.name(),
                    e
                );
                FlushOutcome::Failed(count)
            }
        }
    }

    /// Ticks forever. The first tick fires one full period after start.
    pub async fn run(self) {
        info!("⏰ Starting flush scheduler (interval: {:?})", self.period);

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.flush_once().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
