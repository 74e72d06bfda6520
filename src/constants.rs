//! Application-wide constants and defaults
//!
//! Config defaults live here so the YAML layer and the tests agree on them.

/// Feed defaults
pub mod feed {
    /// Binance raw stream endpoint
    pub const DEFAULT_URL: &str = "wss://stream.binance.com:9443/ws";

    /// Event-type tag carried in the `e` field of trade messages
    pub const TRADE_EVENT_TYPE: &str = "trade";

    /// Request id sent with the SUBSCRIBE call
    pub const SUBSCRIBE_REQUEST_ID: u64 = 1;

    pub const DEFAULT_SYMBOLS: [&str; 3] = ["BTCUSDT", "ETHUSDT", "SOLUSDT"];

    pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
}

/// Batching and dispatch defaults
pub mod batching {
    use std::time::Duration;

    /// Wall-clock period between drains
    pub const DEFAULT_FLUSH_INTERVAL_SECS: f64 = 2.0;

    /// Accepted flush interval range; a zero period would stop the ticker
    pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);
    pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(86_400);

    /// Drained batches larger than this are reported with a warning
    pub const DEFAULT_PENDING_WARN_THRESHOLD: usize = 10_000;

    pub const DEFAULT_SINK_TIMEOUT_SECS: u64 = 10;
}

/// Anomaly model defaults
pub mod model {
    pub const DEFAULT_N_ESTIMATORS: usize = 100;

    /// Expected share of outliers in the training data
    pub const DEFAULT_CONTAMINATION: f64 = 0.02;

    pub const DEFAULT_SEED: u64 = 42;

    /// Upper bound on the per-tree subsample size
    pub const DEFAULT_MAX_SAMPLES: usize = 256;

    /// Euler-Mascheroni constant, used by the average path length estimate
    pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

    /// Bootstrap sample the model is fitted on before live traffic:
    /// `[price, quantity]` of seven BTCUSDT trades.
    pub const BOOTSTRAP_TRADES: [[f64; 2]; 7] = [
        [70000.0, 0.1],
        [70100.0, 0.05],
        [70050.0, 0.2],
        [69900.0, 0.15],
        [70200.0, 0.08],
        [70150.0, 0.3],
        [69800.0, 0.12],
    ];
}
