use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::FeedConfig;
use crate::constants::feed::SUBSCRIBE_REQUEST_ID;
use crate::error::FeedError;
use crate::services::pipeline::TradeProcessor;

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Streaming trade connection. Every text frame is handed to the
/// `TradeProcessor` on the reader task as it arrives.
#[derive(Clone, Debug)]
pub struct TradeFeed {
    url: String,
    channels: Vec<String>,
}

impl TradeFeed {
    pub fn new(url: impl Into<String>, channels: Vec<String>) -> Self {
        Self {
            url: url.into(),
            channels,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.url.clone(), config.channels())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn subscribe_request(channels: &[String]) -> Value {
        json!({"method": "SUBSCRIBE", "params": channels, "id": SUBSCRIBE_REQUEST_ID})
    }

    async fn subscribe(write: &mut WsWriter, channels: &[String]) -> Result<(), FeedError> {
        let sub = Self::subscribe_request(channels);
        write
            .send(Message::Text(sub.to_string()))
            .await
            .map_err(|e| FeedError::Subscribe(e.to_string()))
    }

    /// Runs one connection until the server closes it (`Ok`) or the
    /// transport fails (`Err`).
    pub async fn run(&self, processor: &TradeProcessor) -> Result<(), FeedError> {
        info!("Connecting to WS: {}", self.url);
        let (ws_stream, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        info!("Connection opened. Subscribing to trade streams: {:?}", self.channels);
        Self::subscribe(&mut write, &self.channels).await?;

        while let Some(msg) = read.next().await {
            match msg? {
                Message::Text(text) => {
                    processor.handle_message(&text);
                }
                Message::Ping(payload) => {
                    write.send(Message::Pong(payload)).await?;
                }
                Message::Close(frame) => {
                    warn!("### WebSocket closed ### {:?}", frame);
                    return Ok(());
                }
                other => debug!("Ignoring non-text frame ({} bytes)", other.len()),
            }
        }

        warn!("WebSocket stream ended");
        Ok(())
    }

    /// Keeps the feed up for the life of the process: every close or
    /// transport fault is logged and followed by a reconnect after `delay`.
    pub async fn run_forever(&self, processor: &TradeProcessor, delay: Duration) {
        loop {
            match self.run(processor).await {
                Ok(()) => info!("Feed connection closed by server"),
                Err(e) => {
                    processor.stats().record_feed_fault();
                    error!("WebSocket Error: {}", e);
                }
            }
            info!("Reconnecting in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}
