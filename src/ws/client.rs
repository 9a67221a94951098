//! Reconnecting WebSocket client
//!
//! One background task per connection: dials, streams frames into an mpsc
//! channel, and reconnects with exponential backoff when the stream drops.
//! The backoff delay resets to its floor after every successful connect.

use super::backoff::Backoff;
use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Reusable WebSocket client with automatic reconnection and keepalive
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// The configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect receive-only; returns the inbound message channel
    pub fn connect(&self) -> mpsc::Receiver<WsMessage> {
        let (msg_tx, msg_rx) = mpsc::channel(1024);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = run_connection_loop(config, msg_tx, None).await {
                tracing::error!(error = %e, "WebSocket connection loop terminated");
            }
        });

        msg_rx
    }

    /// Connect with an outbound channel for sending text frames
    ///
    /// Returns (inbound receiver, outbound sender). The background task runs
    /// until the receiver is dropped or the reconnect budget is exhausted;
    /// server-side closes trigger a reconnect like any other disconnect.
    pub fn connect_bidirectional(&self) -> (mpsc::Receiver<WsMessage>, mpsc::Sender<String>) {
        let (msg_tx, msg_rx) = mpsc::channel(1024);
        let (send_tx, send_rx) = mpsc::channel(256);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = run_connection_loop(config, msg_tx, Some(send_rx)).await {
                tracing::error!(error = %e, "WebSocket connection loop terminated");
            }
        });

        (msg_rx, send_tx)
    }
}

/// Outer loop: connect, stream until failure, back off, repeat
async fn run_connection_loop(
    config: WsConfig,
    tx: mpsc::Sender<WsMessage>,
    mut send_rx: Option<mpsc::Receiver<String>>,
) -> Result<(), WsError> {
    let mut attempts = 0u32;
    let mut backoff = Backoff::new(
        config.initial_reconnect_delay,
        config.max_reconnect_delay,
    );

    loop {
        match connect_and_stream(&config, &tx, &mut send_rx, &mut backoff).await {
            Ok(()) => {
                tracing::info!("WebSocket consumer gone, stopping");
                let _ = tx.send(WsMessage::Disconnected).await;
                return Ok(());
            }
            Err(e) => {
                attempts += 1;
                counter!("marketpulse_ws_reconnects_total").increment(1);
                tracing::warn!(error = %e, attempt = attempts, "WebSocket connection error");

                if config.max_reconnect_attempts > 0 && attempts >= config.max_reconnect_attempts {
                    tracing::error!("Max reconnection attempts reached");
                    let _ = tx.send(WsMessage::Disconnected).await;
                    return Err(WsError::MaxReconnectsExceeded);
                }

                if tx.is_closed() {
                    tracing::debug!("Receiver dropped, stopping reconnection");
                    return Ok(());
                }

                let _ = tx.send(WsMessage::Reconnecting { attempt: attempts }).await;
                sleep(backoff.next_delay()).await;
            }
        }
    }
}

/// Dial once and pump frames until the connection drops
async fn connect_and_stream(
    config: &WsConfig,
    tx: &mpsc::Sender<WsMessage>,
    send_rx: &mut Option<mpsc::Receiver<String>>,
    backoff: &mut Backoff,
) -> Result<(), WsError> {
    tracing::info!(url = %config.url, "Connecting to WebSocket");

    let (ws_stream, _response) = connect_async(&config.url)
        .await
        .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

    // Any successful connect resets the reconnect delay to its floor
    backoff.reset();

    let (mut write, mut read) = ws_stream.split();

    if tx.send(WsMessage::Connected).await.is_err() {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(config.ping_interval);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping_interval.tick().await; // first tick fires immediately
    let mut waiting_for_pong = false;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if tx.send(WsMessage::Text(text)).await.is_err() {
                            return Ok(());
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        if tx.send(WsMessage::Binary(data)).await.is_err() {
                            return Ok(());
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        waiting_for_pong = false;
                    }
                    Some(Ok(Message::Close(_))) => {
                        // A server close is a disconnect, not a shutdown;
                        // only the consumer going away ends the loop
                        tracing::info!("Received close frame");
                        return Err(WsError::ConnectionFailed("server closed connection".into()));
                    }
                    Some(Err(e)) => {
                        return Err(WsError::ConnectionFailed(e.to_string()));
                    }
                    None => {
                        return Err(WsError::ConnectionFailed("stream ended unexpectedly".into()));
                    }
                    _ => {}
                }
            }

            msg = async {
                match send_rx.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match msg {
                    Some(text) => {
                        write.send(Message::Text(text)).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    }
                    None => {
                        // Sender dropped, close connection
                        return Ok(());
                    }
                }
            }

            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    return Err(WsError::ConnectionFailed("pong timeout".into()));
                }
                write.send(Message::Ping(vec![])).await
                    .map_err(|e| WsError::SendFailed(e.to_string()))?;
                waiting_for_pong = true;
            }
        }
    }
}
