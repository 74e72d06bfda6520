use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anomaly_stream::api::{self, AppState};
use anomaly_stream::config::AppConfig;
use anomaly_stream::data::accumulator::BatchAccumulator;
use anomaly_stream::error::AppError;
use anomaly_stream::feed::TradeFeed;
use anomaly_stream::scoring::Scorer;
use anomaly_stream::services::{build_sink, FlushScheduler, PipelineStats, TradeProcessor};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // Load Configuration
    let config = AppConfig::load()?;

    // Setup Logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Anomaly Stream...");
    info!("Loaded Configuration: {:?}", redacted(&config));

    let scorer = Arc::new(Scorer::bootstrap(&config.model)?);
    let accumulator = Arc::new(BatchAccumulator::new());
    let stats = Arc::new(PipelineStats::new());

    let sink = build_sink(&config.sink)?;
    match &config.sink.url {
        Some(_) => info!("Batches go to the configured push URL"),
        None => warn!("No sink URL configured (set SINK_PUSH_URL); batches will only be logged"),
    }

    let flusher = FlushScheduler::new(accumulator.clone(), sink, stats.clone(), config.flush_interval())
        .with_warn_threshold(config.pending_warn_threshold)
        .spawn();

    if let Some(port) = config.api.port {
        let state = Arc::new(AppState {
            stats: stats.clone(),
            accumulator: accumulator.clone(),
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        // Bind failures abort startup.
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tokio::spawn(async move {
            if let Err(e) = api::serve(state, listener).await {
                error!("API server stopped: {}", e);
            }
        });
    }

    let processor = TradeProcessor::new(scorer, accumulator.clone(), stats.clone())
        .with_event_type(config.feed.event_type.clone());
    let feed = TradeFeed::from_config(&config.feed);
    let reconnect_delay = Duration::from_secs(config.feed.reconnect_delay_secs);

    info!("Starting data stream... Batches will be sent every {:?}", config.flush_interval());

    tokio::select! {
        _ = feed.run_forever(&processor, reconnect_delay) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        }
    }

    flusher.abort();
    let abandoned = accumulator.len();
    if abandoned > 0 {
        warn!("Shutting down with {} buffered trades not sent", abandoned);
    }
    info!("Final stats: {:?}", stats.snapshot());
    Ok(())
}

/// Config for logging, with the sink credential masked.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if shown.sink.api_key.is_some() {
        shown.sink.api_key = Some("***".to_string());
    }
    if let Some(url) = &shown.sink.url {
        // Push URLs often carry their key in the query string.
        shown.sink.url = Some(url.split('?').next().unwrap_or(url).to_string());
    }
    shown
}
