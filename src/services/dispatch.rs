//! Sink side: pushes a drained batch downstream, once.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::SinkConfig;
use crate::error::DispatchError;
use crate::events::Batch;

/// A downstream consumer of batches. Delivery is best-effort: a failed push
/// is reported and the batch is gone.
#[async_trait]
pub trait BatchSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn push(&self, batch: Batch) -> Result<(), DispatchError>;
}

/// POSTs each batch as a JSON array to a push URL. Only `200 OK` counts
/// as delivered.
#[derive(Clone, Debug)]
pub struct HttpSink {
    url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpSink {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl BatchSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn push(&self, batch: Batch) -> Result<(), DispatchError> {
        let body = serde_json::to_vec(&batch)?;
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DispatchError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

/// Dry-run sink used when no push URL is configured.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl BatchSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn push(&self, batch: Batch) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(&batch)?;
        info!("[DRY-RUN] Would push {} trades: {}", batch.len(), payload);
        Ok(())
    }
}

/// `HttpSink` when a URL is configured, `LogSink` otherwise.
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn BatchSink>, DispatchError> {
    match &config.url {
        Some(url) => Ok(Arc::new(HttpSink::new(
            url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(LogSink)),
    }
}
