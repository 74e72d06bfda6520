//! Operator HTTP surface: liveness and pipeline counters.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::data::accumulator::BatchAccumulator;
use crate::services::stats::{PipelineStats, StatsSnapshot};

pub struct AppState {
    pub stats: Arc<PipelineStats>,
    pub accumulator: Arc<BatchAccumulator>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// Buffered records waiting for the next flush
    pub pending: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .with_state(state)
}

/// Serves on an already-bound listener so bind errors surface at startup.
pub async fn serve(state: Arc<AppState>, listener: TcpListener) -> std::io::Result<()> {
    info!("API Server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatsResponse {
        counters: state.stats.snapshot(),
        pending: state.accumulator.len(),
    })
}
