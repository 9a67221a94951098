//! Market price stream client
//!
//! Rides the generic `ws` transport: subscriptions are recorded locally and
//! the subscribe request is sent whenever a connection is up, so every market
//! is replayed automatically after a reconnect. Inbound frames are classified
//! and dispatched to the per-market handler.

use super::types::{classify_message, ControlRequest, MarketUpdate};
use crate::ws::{WsClient, WsConfig, WsMessage};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};

/// Default market data endpoint
pub const DEFAULT_STREAM_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";

/// Callback invoked with each update for a subscribed market
pub type UpdateHandler = Box<dyn Fn(&str, &MarketUpdate) + Send>;

/// Price stream configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: String,
    /// Reconnect attempts before giving up (0 = never give up)
    pub max_reconnects: u32,
    pub initial_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            max_reconnects: 0,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
        }
    }
}

impl StreamConfig {
    fn ws_config(&self) -> WsConfig {
        WsConfig::new(&self.url)
            .max_reconnects(self.max_reconnects)
            .initial_delay(self.initial_reconnect_delay)
            .max_delay(self.max_reconnect_delay)
    }
}

/// Streaming price client with per-market subscriptions
pub struct PriceStreamClient {
    config: StreamConfig,
    subscriptions: Arc<Mutex<HashMap<String, UpdateHandler>>>,
    connected: Arc<AtomicBool>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl PriceStreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(false)),
            outbound: Mutex::new(None),
            stop_tx: Mutex::new(None),
        }
    }

    /// Whether the underlying connection is currently up
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Start the background connection and dispatch tasks
    ///
    /// Idempotent; a second call while running is a no-op.
    pub async fn start(&self) {
        let mut outbound = self.outbound.lock().await;
        if outbound.is_some() {
            return;
        }

        let client = WsClient::new(self.config.ws_config());
        let (msg_rx, send_tx) = client.connect_bidirectional();
        let (stop_tx, stop_rx) = watch::channel(false);

        *outbound = Some(send_tx.clone());
        *self.stop_tx.lock().await = Some(stop_tx);

        let subscriptions = Arc::clone(&self.subscriptions);
        let connected = Arc::clone(&self.connected);
        tokio::spawn(async move {
            run_dispatch_loop(msg_rx, subscriptions, connected, send_tx, stop_rx).await;
        });
    }

    /// Stop the stream and drop the connection
    pub async fn stop(&self) {
        if let Some(stop_tx) = self.stop_tx.lock().await.take() {
            let _ = stop_tx.send(true);
        }
        // Dropping the sender closes the underlying connection
        *self.outbound.lock().await = None;
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Subscribe to a market
    ///
    /// The subscription is recorded immediately. If the connection is up the
    /// subscribe request goes out now; otherwise it is replayed when the
    /// connection (re-)establishes, so subscribing before `start` is fine.
    pub async fn subscribe<F>(&self, market: &str, handler: F)
    where
        F: Fn(&str, &MarketUpdate) + Send + 'static,
    {
        self.subscriptions
            .lock()
            .await
            .insert(market.to_string(), Box::new(handler));

        if self.is_connected() {
            if let Some(tx) = self.outbound.lock().await.as_ref() {
                send_control(tx, &ControlRequest::subscribe(market)).await;
            }
        }
        tracing::info!(market = %market, "Subscribed to market");
    }

    /// Remove a market subscription; the unsubscribe request is best-effort
    pub async fn unsubscribe(&self, market: &str) {
        if self.subscriptions.lock().await.remove(market).is_none() {
            return;
        }

        if self.is_connected() {
            if let Some(tx) = self.outbound.lock().await.as_ref() {
                send_control(tx, &ControlRequest::unsubscribe(market)).await;
            }
        }
        tracing::info!(market = %market, "Unsubscribed from market");
    }

    /// Markets with an active subscription
    pub async fn subscribed_markets(&self) -> Vec<String> {
        self.subscriptions.lock().await.keys().cloned().collect()
    }
}

async fn send_control(tx: &mpsc::Sender<String>, request: &ControlRequest) {
    match serde_json::to_string(request) {
        Ok(json) => {
            if tx.send(json).await.is_err() {
                tracing::warn!(market = %request.market, "Stream connection gone, request dropped");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize control request"),
    }
}

/// Consume transport messages, maintain connection state and dispatch updates
///
/// Every `Connected` replays a subscribe request for each recorded market. A
/// panicking handler is caught and logged; the loop keeps running.
pub(crate) async fn run_dispatch_loop(
    mut msg_rx: mpsc::Receiver<WsMessage>,
    subscriptions: Arc<Mutex<HashMap<String, UpdateHandler>>>,
    connected: Arc<AtomicBool>,
    outbound: mpsc::Sender<String>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                // Err means the stop sender is gone (client dropped)
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::debug!("Stream dispatch loop stopped");
                    return;
                }
            }

            msg = msg_rx.recv() => {
                let Some(msg) = msg else {
                    connected.store(false, Ordering::Relaxed);
                    return;
                };

                match msg {
                    WsMessage::Connected => {
                        connected.store(true, Ordering::Relaxed);
                        let markets: Vec<String> =
                            subscriptions.lock().await.keys().cloned().collect();
                        tracing::info!(markets = markets.len(), "Stream connected, replaying subscriptions");
                        for market in markets {
                            send_control(&outbound, &ControlRequest::subscribe(market)).await;
                        }
                    }
                    WsMessage::Reconnecting { attempt } => {
                        connected.store(false, Ordering::Relaxed);
                        tracing::warn!(attempt, "Stream reconnecting");
                    }
                    WsMessage::Disconnected => {
                        connected.store(false, Ordering::Relaxed);
                        tracing::warn!("Stream disconnected");
                        return;
                    }
                    WsMessage::Text(text) => {
                        if let Some((market, update)) = classify_message(&text) {
                            dispatch_update(&subscriptions, &market, &update).await;
                        }
                    }
                    WsMessage::Binary(_) => {}
                }
            }
        }
    }
}

async fn dispatch_update(
    subscriptions: &Mutex<HashMap<String, UpdateHandler>>,
    market: &str,
    update: &MarketUpdate,
) {
    let guard = subscriptions.lock().await;
    let Some(handler) = guard.get(market) else {
        return;
    };

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| handler(market, update)));
    if outcome.is_err() {
        tracing::error!(market = %market, "Update handler panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Mutex as StdMutex;

    fn recording_handler(log: Arc<StdMutex<Vec<(String, MarketUpdate)>>>) -> UpdateHandler {
        Box::new(move |market, update| {
            log.lock().unwrap().push((market.to_string(), update.clone()));
        })
    }

    async fn spawn_loop(
        subscriptions: Arc<Mutex<HashMap<String, UpdateHandler>>>,
    ) -> (
        mpsc::Sender<WsMessage>,
        mpsc::Receiver<String>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
    ) {
        let (msg_tx, msg_rx) = mpsc::channel(64);
        let (out_tx, out_rx) = mpsc::channel(64);
        let (stop_tx, stop_rx) = watch::channel(false);
        let connected = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_dispatch_loop(
            msg_rx,
            subscriptions,
            connected,
            out_tx,
            stop_rx,
        ));
        (msg_tx, out_rx, stop_tx, handle)
    }

    #[tokio::test]
    async fn test_connected_replays_subscriptions() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let subscriptions = Arc::new(Mutex::new(HashMap::new()));
        subscriptions
            .lock()
            .await
            .insert("mkt-1".to_string(), recording_handler(Arc::clone(&log)));
        subscriptions
            .lock()
            .await
            .insert("mkt-2".to_string(), recording_handler(Arc::clone(&log)));

        let (msg_tx, mut out_rx, _stop_tx, handle) = spawn_loop(subscriptions).await;

        msg_tx.send(WsMessage::Connected).await.unwrap();
        let first = out_rx.recv().await.unwrap();
        let second = out_rx.recv().await.unwrap();
        for request in [&first, &second] {
            assert!(request.contains("\"type\":\"subscribe\""));
        }
        let combined = format!("{first}{second}");
        assert!(combined.contains("mkt-1") && combined.contains("mkt-2"));

        // Reconnect replays again
        msg_tx.send(WsMessage::Reconnecting { attempt: 1 }).await.unwrap();
        msg_tx.send(WsMessage::Connected).await.unwrap();
        assert!(out_rx.recv().await.unwrap().contains("subscribe"));
        assert!(out_rx.recv().await.unwrap().contains("subscribe"));

        msg_tx.send(WsMessage::Disconnected).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_text_frames_dispatch_to_handler() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let subscriptions = Arc::new(Mutex::new(HashMap::new()));
        subscriptions
            .lock()
            .await
            .insert("mkt-1".to_string(), recording_handler(Arc::clone(&log)));

        let (msg_tx, _out_rx, _stop_tx, handle) = spawn_loop(subscriptions).await;

        msg_tx
            .send(WsMessage::Text(
                r#"{"type": "trade", "market": "mkt-1", "price": "0.42", "size": "5"}"#.to_string(),
            ))
            .await
            .unwrap();
        // Update for a market nobody subscribed to is dropped
        msg_tx
            .send(WsMessage::Text(
                r#"{"type": "trade", "market": "other", "price": "0.9"}"#.to_string(),
            ))
            .await
            .unwrap();
        msg_tx.send(WsMessage::Disconnected).await.unwrap();
        handle.await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "mkt-1");
        match &log[0].1 {
            MarketUpdate::Trade { price, .. } => assert_eq!(*price, dec!(0.42)),
            other => panic!("expected trade, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_kill_loop() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let subscriptions = Arc::new(Mutex::new(HashMap::new()));
        subscriptions.lock().await.insert(
            "bad".to_string(),
            Box::new(|_: &str, _: &MarketUpdate| panic!("handler bug")) as UpdateHandler,
        );
        subscriptions
            .lock()
            .await
            .insert("good".to_string(), recording_handler(Arc::clone(&log)));

        let (msg_tx, _out_rx, _stop_tx, handle) = spawn_loop(subscriptions).await;

        msg_tx
            .send(WsMessage::Text(
                r#"{"type": "trade", "market": "bad", "price": "0.5"}"#.to_string(),
            ))
            .await
            .unwrap();
        msg_tx
            .send(WsMessage::Text(
                r#"{"type": "trade", "market": "good", "price": "0.6"}"#.to_string(),
            ))
            .await
            .unwrap();
        msg_tx.send(WsMessage::Disconnected).await.unwrap();
        handle.await.unwrap();

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_signal_ends_loop() {
        let subscriptions = Arc::new(Mutex::new(HashMap::new()));
        let (_msg_tx, _out_rx, stop_tx, handle) = spawn_loop(subscriptions).await;

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_stop_sender_ends_loop() {
        let subscriptions = Arc::new(Mutex::new(HashMap::new()));
        let (_msg_tx, _out_rx, stop_tx, handle) = spawn_loop(subscriptions).await;

        drop(stop_tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop when the stop sender is dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_resubscribe_replaces_handler() {
        let client = PriceStreamClient::new(StreamConfig::default());
        let log = Arc::new(StdMutex::new(Vec::new()));

        let first = Arc::clone(&log);
        client
            .subscribe("mkt", move |_, _| first.lock().unwrap().push(1))
            .await;
        let second = Arc::clone(&log);
        client
            .subscribe("mkt", move |_, _| second.lock().unwrap().push(2))
            .await;
        assert_eq!(client.subscribed_markets().await.len(), 1);

        let update = MarketUpdate::Trade {
            received_at: chrono::Utc::now(),
            price: rust_decimal_macros::dec!(0.5),
            side: None,
            size: None,
        };
        dispatch_update(&client.subscriptions, "mkt", &update).await;
        assert_eq!(*log.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_subscribe_before_start_is_recorded() {
        let client = PriceStreamClient::new(StreamConfig::default());
        client.subscribe("mkt-1", |_, _| {}).await;
        assert!(!client.is_connected());
        assert_eq!(client.subscribed_markets().await, vec!["mkt-1".to_string()]);

        client.unsubscribe("mkt-1").await;
        assert!(client.subscribed_markets().await.is_empty());
    }
}
