pub mod dispatch;
pub mod flush;
pub mod pipeline;
pub mod stats;

pub use dispatch::{build_sink, BatchSink, HttpSink, LogSink};
pub use flush::{FlushOutcome, FlushScheduler};
pub use pipeline::{ProcessOutcome, TradeProcessor};
pub use stats::{PipelineStats, StatsSnapshot};
