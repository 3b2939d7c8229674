//! Market-data feed client.
//!
//! One process-wide connection to the provider. Subscriptions are
//! reference-counted per symbol: the first subscriber triggers the
//! protocol-level subscribe, later subscribers share the tick fan-out,
//! and the last one out sends the unsubscribe. A connection task owns the
//! socket; the client reaches it over a command channel, which keeps the
//! transport swappable for a scripted task in tests.

use super::protocol::{FeedMessage, FeedRequest, RequestEnvelope};
use crate::config::Config;
use crate::error::{FeedError, FeedResult};
use crate::types::{Candle, Tick, Timeframe};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Application-level keep-alive interval.
const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Per-attempt bound on establishing the socket.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-symbol tick fan-out buffer.
const TICK_CHANNEL_CAPACITY: usize = 512;

/// Commands from the client to the connection task.
#[derive(Debug)]
pub enum FeedCommand {
    Subscribe {
        symbol: String,
    },
    Unsubscribe {
        symbol: String,
    },
    FetchHistory {
        symbol: String,
        timeframe: Timeframe,
        count: usize,
        reply: oneshot::Sender<FeedResult<Vec<Candle>>>,
    },
}

/// Connection lifecycle events.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    SymbolError { symbol: String, message: String },
}

/// Fan-out state for one subscribed symbol.
struct TickRoom {
    tx: broadcast::Sender<Tick>,
    subscribers: HashSet<String>,
}

/// Handle to the market-data feed.
pub struct FeedClient {
    rooms: DashMap<String, TickRoom>,
    events: broadcast::Sender<FeedEvent>,
    commands: mpsc::UnboundedSender<FeedCommand>,
    connected: AtomicBool,
    history_timeout: Duration,
}

impl FeedClient {
    /// Create the client and the command receiver its connection task
    /// consumes. Production hands the receiver to [`FeedClient::run`];
    /// tests drive it with a scripted task.
    pub fn new(history_timeout: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<FeedCommand>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let client = Arc::new(Self {
            rooms: DashMap::new(),
            events,
            commands,
            connected: AtomicBool::new(false),
            history_timeout,
        });
        (client, command_rx)
    }

    /// Lock-free connection snapshot.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Subscribe to connection lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Reference-counted tick subscription. The first subscriber for a
    /// symbol issues the protocol-level subscribe.
    pub fn subscribe_ticks(&self, symbol: &str, subscriber_id: &str) -> broadcast::Receiver<Tick> {
        let mut room = self.rooms.entry(symbol.to_string()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
            TickRoom {
                tx,
                subscribers: HashSet::new(),
            }
        });

        let first = room.subscribers.is_empty();
        room.subscribers.insert(subscriber_id.to_string());
        let rx = room.tx.subscribe();
        drop(room);

        if first {
            debug!(symbol, "first subscriber, issuing protocol subscribe");
            let _ = self.commands.send(FeedCommand::Subscribe {
                symbol: symbol.to_string(),
            });
        }
        rx
    }

    /// Decrement the symbol's subscriber count; the last one out sends
    /// the protocol-level unsubscribe.
    pub fn unsubscribe_ticks(&self, symbol: &str, subscriber_id: &str) {
        let mut empty = false;
        if let Some(mut room) = self.rooms.get_mut(symbol) {
            room.subscribers.remove(subscriber_id);
            empty = room.subscribers.is_empty();
        }
        if empty {
            self.rooms.remove(symbol);
            debug!(symbol, "last subscriber gone, issuing protocol unsubscribe");
            let _ = self.commands.send(FeedCommand::Unsubscribe {
                symbol: symbol.to_string(),
            });
        }
    }

    /// Fetch the `count` most recent closed candles, oldest first.
    pub async fn fetch_candle_history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> FeedResult<Vec<Candle>> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(FeedCommand::FetchHistory {
                symbol: symbol.to_string(),
                timeframe,
                count,
                reply,
            })
            .map_err(|_| FeedError::Unavailable("connection task gone".to_string()))?;

        match tokio::time::timeout(self.history_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(FeedError::Unavailable(
                "history request dropped".to_string(),
            )),
            Err(_) => Err(FeedError::Timeout(self.history_timeout.as_secs())),
        }
    }

    /// Symbols with at least one live subscriber.
    pub fn active_symbols(&self) -> Vec<String> {
        self.rooms.iter().map(|r| r.key().clone()).collect()
    }

    /// Fan a tick out to the symbol's subscribers. Called by the
    /// connection task (or a test transport).
    pub fn deliver_tick(&self, tick: Tick) {
        if let Some(room) = self.rooms.get(&tick.symbol) {
            let _ = room.tx.send(tick);
        }
    }

    /// Mark the connection live and notify. Called after subscriptions
    /// have been re-issued.
    pub fn mark_connected(&self) {
        if !self.connected.swap(true, Ordering::Relaxed) {
            info!("feed connected");
            let _ = self.events.send(FeedEvent::Connected);
        }
    }

    /// Mark the connection down and notify.
    pub fn mark_disconnected(&self) {
        if self.connected.swap(false, Ordering::Relaxed) {
            warn!("feed disconnected");
            let _ = self.events.send(FeedEvent::Disconnected);
        }
    }

    /// Surface a provider-side symbol error to subscribers.
    pub fn report_symbol_error(&self, symbol: &str, message: &str) {
        warn!(symbol, message, "provider symbol error");
        let _ = self.events.send(FeedEvent::SymbolError {
            symbol: symbol.to_string(),
            message: message.to_string(),
        });
    }

    /// Spawn the WebSocket connection task: connect, re-issue active
    /// subscriptions, pump messages, reconnect with capped exponential
    /// backoff plus jitter.
    pub fn run(
        self: &Arc<Self>,
        config: &Config,
        mut commands: mpsc::UnboundedReceiver<FeedCommand>,
    ) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        let url = match &config.feed_app_id {
            Some(app_id) => format!("{}?app_id={}", config.feed_url, app_id),
            None => config.feed_url.clone(),
        };
        let base = config.reconnect_base_secs.max(1);
        let cap = config.reconnect_cap_secs.max(base);

        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                match client.run_connection(&url, &mut commands).await {
                    Ok(()) => {
                        // Command channel closed: client dropped, stop.
                        info!("feed connection task stopping");
                        return;
                    }
                    Err(e) => {
                        client.mark_disconnected();
                        let backoff = (base << attempt.min(16)).min(cap);
                        let jitter = rand::thread_rng().gen_range(0..=backoff.max(1) / 2);
                        error!(
                            error = %e,
                            retry_in = backoff + jitter,
                            "feed connection lost, reconnecting"
                        );
                        tokio::time::sleep(Duration::from_secs(backoff + jitter)).await;
                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        })
    }

    async fn run_connection(
        self: &Arc<Self>,
        url: &str,
        commands: &mut mpsc::UnboundedReceiver<FeedCommand>,
    ) -> anyhow::Result<()> {
        info!(url, "connecting to feed");
        let (ws_stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| anyhow::anyhow!("connect timed out"))??;
        let (mut write, mut read) = ws_stream.split();

        let mut req_counter: u64 = 0;
        let mut pending: HashMap<u64, PendingHistory> = HashMap::new();

        // Re-issue every active subscription before signalling Connected.
        for symbol in self.active_symbols() {
            req_counter += 1;
            let envelope = RequestEnvelope {
                req_id: req_counter,
                request: FeedRequest::SubscribeTicks { symbol },
            };
            write.send(Message::Text(serde_json::to_string(&envelope)?)).await?;
        }
        self.mark_connected();

        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_message(&text, &mut pending),
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            break Err(anyhow::anyhow!("server closed connection"));
                        }
                        Some(Err(e)) => break Err(e.into()),
                        None => break Err(anyhow::anyhow!("stream ended")),
                        _ => {}
                    }
                }
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else {
                        break Ok(());
                    };
                    req_counter += 1;
                    let request = match cmd {
                        FeedCommand::Subscribe { symbol } => {
                            FeedRequest::SubscribeTicks { symbol }
                        }
                        FeedCommand::Unsubscribe { symbol } => {
                            FeedRequest::UnsubscribeTicks { symbol }
                        }
                        FeedCommand::FetchHistory { symbol, timeframe, count, reply } => {
                            pending.insert(
                                req_counter,
                                PendingHistory { symbol: symbol.clone(), timeframe, reply },
                            );
                            FeedRequest::CandleHistory {
                                symbol,
                                granularity: timeframe.secs(),
                                count,
                            }
                        }
                    };
                    let envelope = RequestEnvelope { req_id: req_counter, request };
                    if let Err(e) = write
                        .send(Message::Text(serde_json::to_string(&envelope)?))
                        .await
                    {
                        break Err(e.into());
                    }
                }
                _ = ping.tick() => {
                    req_counter += 1;
                    let envelope = RequestEnvelope { req_id: req_counter, request: FeedRequest::Ping };
                    if let Err(e) = write
                        .send(Message::Text(serde_json::to_string(&envelope)?))
                        .await
                    {
                        break Err(e.into());
                    }
                }
            }
        };

        // In-flight history requests cannot complete on this connection.
        for (_, entry) in pending.drain() {
            let _ = entry
                .reply
                .send(Err(FeedError::Unavailable("connection lost".to_string())));
        }
        result
    }

    fn handle_message(&self, text: &str, pending: &mut HashMap<u64, PendingHistory>) {
        let message: FeedMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "malformed feed frame dropped");
                return;
            }
        };

        match message {
            FeedMessage::Tick { symbol, price, epoch } => {
                self.deliver_tick(Tick::new(symbol, price, epoch));
            }
            FeedMessage::Candles { req_id, candles } => {
                if let Some(entry) = pending.remove(&req_id) {
                    let mut history: Vec<Candle> = candles
                        .into_iter()
                        .map(|c| c.into_candle(&entry.symbol, entry.timeframe))
                        .collect();
                    history.sort_by_key(|c| c.start_epoch);
                    let _ = entry.reply.send(Ok(history));
                }
            }
            FeedMessage::Subscribed { symbol, .. } => {
                debug!(symbol = %symbol, "subscription acknowledged");
            }
            FeedMessage::Error { req_id, symbol, message } => {
                if let Some(req_id) = req_id {
                    if let Some(entry) = pending.remove(&req_id) {
                        let _ = entry.reply.send(Err(FeedError::Symbol {
                            symbol: entry.symbol,
                            message: message.clone(),
                        }));
                        return;
                    }
                }
                if let Some(symbol) = symbol {
                    self.report_symbol_error(&symbol, &message);
                } else {
                    warn!(message = %message, "provider error");
                }
            }
            FeedMessage::Pong { .. } => {}
        }
    }
}

struct PendingHistory {
    symbol: String,
    timeframe: Timeframe,
    reply: oneshot::Sender<FeedResult<Vec<Candle>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (Arc<FeedClient>, mpsc::UnboundedReceiver<FeedCommand>) {
        FeedClient::new(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_first_subscriber_issues_subscribe() {
        let (client, mut commands) = client();
        let _rx = client.subscribe_ticks("R_100", "session-1");

        let cmd = commands.recv().await.unwrap();
        assert!(matches!(cmd, FeedCommand::Subscribe { symbol } if symbol == "R_100"));
    }

    #[tokio::test]
    async fn test_second_subscriber_shares_subscription() {
        let (client, mut commands) = client();
        let _a = client.subscribe_ticks("R_100", "session-1");
        let _b = client.subscribe_ticks("R_100", "session-2");

        assert!(commands.recv().await.is_some());
        assert!(commands.try_recv().is_err(), "no second protocol subscribe");
    }

    #[tokio::test]
    async fn test_last_unsubscriber_issues_unsubscribe() {
        let (client, mut commands) = client();
        let _a = client.subscribe_ticks("R_100", "session-1");
        let _b = client.subscribe_ticks("R_100", "session-2");
        commands.recv().await.unwrap();

        client.unsubscribe_ticks("R_100", "session-1");
        assert!(commands.try_recv().is_err(), "one subscriber remains");

        client.unsubscribe_ticks("R_100", "session-2");
        let cmd = commands.recv().await.unwrap();
        assert!(matches!(cmd, FeedCommand::Unsubscribe { symbol } if symbol == "R_100"));
        assert!(client.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn test_tick_fan_out_to_all_subscribers() {
        let (client, _commands) = client();
        let mut a = client.subscribe_ticks("R_100", "session-1");
        let mut b = client.subscribe_ticks("R_100", "session-2");

        client.deliver_tick(Tick::new("R_100", 42.0, 1000));

        assert_eq!(a.recv().await.unwrap().price, 42.0);
        assert_eq!(b.recv().await.unwrap().price, 42.0);
    }

    #[tokio::test]
    async fn test_ticks_for_unsubscribed_symbol_dropped() {
        let (client, _commands) = client();
        let mut rx = client.subscribe_ticks("R_100", "session-1");

        client.deliver_tick(Tick::new("R_50", 1.0, 1000));
        client.deliver_tick(Tick::new("R_100", 2.0, 1001));

        assert_eq!(rx.recv().await.unwrap().symbol, "R_100");
    }

    #[tokio::test]
    async fn test_fetch_history_round_trip() {
        let (client, mut commands) = client();

        let fetch = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.fetch_candle_history("R_100", Timeframe::M1, 2).await }
        });

        let Some(FeedCommand::FetchHistory { symbol, timeframe, count, reply }) =
            commands.recv().await
        else {
            panic!("expected history command");
        };
        assert_eq!(symbol, "R_100");
        assert_eq!(timeframe, Timeframe::M1);
        assert_eq!(count, 2);

        let candles = vec![
            Candle::from_tick(&Tick::new("R_100", 1.0, 0), Timeframe::M1, 0),
            Candle::from_tick(&Tick::new("R_100", 2.0, 60), Timeframe::M1, 60),
        ];
        reply.send(Ok(candles)).unwrap();

        let history = fetch.await.unwrap().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].start_epoch, 0);
    }

    #[tokio::test]
    async fn test_fetch_history_times_out() {
        let (client, mut commands) = client();

        let fetch = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.fetch_candle_history("R_100", Timeframe::M1, 10).await }
        });

        // Swallow the command and never reply.
        let _cmd = commands.recv().await.unwrap();
        let result = fetch.await.unwrap();
        assert!(matches!(result, Err(FeedError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_connection_state_events() {
        let (client, _commands) = client();
        let mut events = client.events();

        assert!(!client.is_connected());
        client.mark_connected();
        assert!(client.is_connected());
        assert!(matches!(events.recv().await.unwrap(), FeedEvent::Connected));

        // Idempotent: a second mark does not re-emit.
        client.mark_connected();
        client.mark_disconnected();
        assert!(!client.is_connected());
        assert!(matches!(events.recv().await.unwrap(), FeedEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_handle_message_resolves_pending_history() {
        let (client, _commands) = client();
        let (reply, rx) = oneshot::channel();
        let mut pending = HashMap::new();
        pending.insert(
            9,
            PendingHistory {
                symbol: "R_100".to_string(),
                timeframe: Timeframe::M1,
                reply,
            },
        );

        let json = r#"{
            "msg_type": "candles",
            "req_id": 9,
            "candles": [
                {"epoch": 60, "open": 2.0, "high": 3.0, "low": 1.0, "close": 2.5},
                {"epoch": 0, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5}
            ]
        }"#;
        client.handle_message(json, &mut pending);

        let history = rx.await.unwrap().unwrap();
        assert_eq!(history.len(), 2);
        // Sorted oldest first regardless of wire order.
        assert_eq!(history[0].start_epoch, 0);
        assert_eq!(history[1].start_epoch, 60);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_handle_message_drops_malformed_frames() {
        let (client, _commands) = client();
        let mut pending = HashMap::new();
        client.handle_message("not json at all", &mut pending);
        client.handle_message(r#"{"msg_type":"unknown_kind"}"#, &mut pending);
    }

    #[tokio::test]
    async fn test_symbol_error_event() {
        let (client, _commands) = client();
        let mut events = client.events();
        let mut pending = HashMap::new();

        let json = r#"{"msg_type":"error","symbol":"BAD","message":"unknown symbol"}"#;
        client.handle_message(json, &mut pending);

        match events.recv().await.unwrap() {
            FeedEvent::SymbolError { symbol, message } => {
                assert_eq!(symbol, "BAD");
                assert_eq!(message, "unknown symbol");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
