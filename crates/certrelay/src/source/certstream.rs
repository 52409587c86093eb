//! Certstream WebSocket source.
//!
//! Connects to a certstream server, decodes every frame as JSON and forwards
//! it unfiltered. A background reader task owns the socket; it keeps the
//! connection alive with pings and gives up when the peer goes quiet.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use super::{EventSource, SourceError, Subscription};

/// Public certstream aggregator.
pub const DEFAULT_CERTSTREAM_URL: &str = "wss://certstream.calidog.io/";

/// Connection parameters for [`CertstreamSource`].
#[derive(Debug, Clone)]
pub struct CertstreamConfig {
    /// WebSocket URL (`ws://` or `wss://`).
    pub url: String,
    /// Upper bound on TCP connect + TLS + WebSocket handshake.
    pub handshake_timeout: Duration,
    /// Interval between keepalive pings.
    pub ping_interval: Duration,
    /// Longest tolerated gap between two inbound frames.
    pub idle_timeout: Duration,
    /// Capacity of the event channel; a full channel stops socket reads.
    pub buffer: usize,
}

impl CertstreamConfig {
    /// Create a config for `url` with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handshake_timeout: Duration::from_secs(15),
            ping_interval: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(15),
            buffer: 256,
        }
    }
}

impl Default for CertstreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CERTSTREAM_URL)
    }
}

/// [`EventSource`] backed by a certstream WebSocket.
#[derive(Debug, Clone)]
pub struct CertstreamSource {
    config: CertstreamConfig,
}

impl CertstreamSource {
    pub const fn new(config: CertstreamConfig) -> Self {
        Self { config }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl EventSource for CertstreamSource {
    async fn subscribe(&self) -> Result<Subscription, SourceError> {
        let timeout = self.config.handshake_timeout;
        let (ws, response) =
            tokio::time::timeout(timeout, tokio_tungstenite::connect_async(self.url()))
                .await
                .map_err(|_| SourceError::Handshake(timeout))?
                .map_err(|e| SourceError::Connect(e.to_string()))?;

        info!(url = %self.config.url, status = %response.status(), "Connected to certstream");

        let (events_tx, events_rx) = mpsc::channel(self.config.buffer.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(1);
        let reader = tokio::spawn(read_frames(ws, self.config.clone(), events_tx, errors_tx));
        Ok(Subscription::with_reader(events_rx, errors_rx, reader))
    }
}

/// Pump frames from `ws` into `events` until the socket closes or faults.
///
/// At most one fault is reported on `errors`, always before `events` is
/// dropped, so the consumer sees the cause before the end of the stream.
async fn read_frames<S>(
    ws: WebSocketStream<S>,
    config: CertstreamConfig,
    events: mpsc::Sender<Value>,
    errors: mpsc::Sender<SourceError>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    let mut ping = tokio::time::interval(config.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await; // Skip first immediate tick

    let idle = tokio::time::sleep(config.idle_timeout);
    tokio::pin!(idle);

    let fault = loop {
        tokio::select! {
            frame = stream.next() => {
                idle.as_mut().reset(Instant::now() + config.idle_timeout);
                let payload = match frame {
                    Some(Ok(Message::Text(text))) => decode(text.as_bytes()),
                    Some(Ok(Message::Binary(bytes))) => decode(&bytes),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Certstream sent close frame");
                        break None;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => break Some(SourceError::Transport(e.to_string())),
                    None => break None,
                };
                match payload {
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            // Subscription released; nobody is listening.
                            break None;
                        }
                        // Time spent blocked on a full channel is not idleness.
                        idle.as_mut().reset(Instant::now() + config.idle_timeout);
                    }
                    Err(e) => break Some(e),
                }
            }
            () = &mut idle => break Some(SourceError::Idle(config.idle_timeout)),
            _ = ping.tick() => {
                if let Err(e) = sink.send(Message::Ping(Vec::new().into())).await {
                    break Some(SourceError::Transport(e.to_string()));
                }
            }
        }
    };

    if let Some(fault) = fault {
        debug!(error = %fault, "Certstream reader stopping");
        let _ = errors.send(fault).await;
    }
    let _ = sink.close().await;
}

fn decode(bytes: &[u8]) -> Result<Value, SourceError> {
    serde_json::from_slice(bytes).map_err(|e| SourceError::Decode(e.to_string()))
}
