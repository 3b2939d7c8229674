//! Session lifecycle and pre-close scheduling.
//!
//! The manager owns every session, its tick pump and its scheduler task.
//! One tick pump runs per (symbol, timeframe) window regardless of how
//! many sessions watch it; feed subscriptions are reference-counted per
//! session by the feed client.

use super::aggregator::CandleAggregator;
use super::signals::SignalEngine;
use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::events::{EngineEvent, EventBus};
use crate::feed::{FeedClient, FeedEvent};
use crate::types::{Candle, Session, SessionOptions, SessionStatus, SignalResult, Timeframe};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Poll cadence while a window has no forming candle yet, and between
/// dedupe re-checks after a late emission.
const IDLE_POLL: Duration = Duration::from_millis(1000);

struct SessionEntry {
    session: Session,
    /// Forming-candle start of the last emitted signal, for dedupe.
    last_signal_candle_start: Option<i64>,
    scheduler: Option<JoinHandle<()>>,
}

struct PumpEntry {
    sessions: HashSet<String>,
    handle: JoinHandle<()>,
}

/// Coordinates feed, aggregator and signal engine per session.
pub struct SessionManager {
    sessions: DashMap<String, SessionEntry>,
    by_chat: DashMap<String, String>,
    pumps: DashMap<(String, Timeframe), PumpEntry>,
    feed: Arc<FeedClient>,
    aggregator: Arc<CandleAggregator>,
    engine: SignalEngine,
    bus: EventBus,
    config: Config,
}

impl SessionManager {
    pub fn new(
        feed: Arc<FeedClient>,
        aggregator: Arc<CandleAggregator>,
        bus: EventBus,
        config: Config,
    ) -> Arc<Self> {
        let engine = SignalEngine::new(config.signal.clone(), config.volatility.clone());
        let manager = Arc::new(Self {
            sessions: DashMap::new(),
            by_chat: DashMap::new(),
            pumps: DashMap::new(),
            feed,
            aggregator,
            engine,
            bus,
            config,
        });
        manager.spawn_feed_listener();
        manager
    }

    /// Start a session: prime history, wire the tick pump, arm the
    /// pre-close scheduler.
    pub async fn start_session(
        self: &Arc<Self>,
        id: &str,
        chat_id: &str,
        symbol: &str,
        timeframe_secs: i64,
        options: Option<SessionOptions>,
    ) -> SessionResult<Session> {
        let timeframe = Timeframe::from_secs(timeframe_secs)
            .ok_or(SessionError::InvalidTimeframe(timeframe_secs))?;

        if self.sessions.contains_key(id) {
            return Err(SessionError::Conflict(id.to_string()));
        }

        let history = self
            .feed
            .fetch_candle_history(symbol, timeframe, self.config.signal.history_candles)
            .await?;
        self.aggregator.initialize(
            symbol,
            timeframe,
            history,
            Some(self.config.signal.window_capacity),
        );

        let tick_rx = self.feed.subscribe_ticks(symbol, id);
        self.ensure_pump(symbol, timeframe, id, tick_rx);

        let session = Session::new(id, chat_id, symbol, timeframe, options);
        self.sessions.insert(
            id.to_string(),
            SessionEntry {
                session: session.clone(),
                last_signal_candle_start: None,
                scheduler: None,
            },
        );
        self.by_chat.insert(chat_id.to_string(), id.to_string());

        let scheduler = self.spawn_scheduler(id.to_string());
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.scheduler = Some(scheduler);
        }

        info!(id, symbol, timeframe = %timeframe, "session started");
        self.bus.emit(EngineEvent::SessionStarted(session.clone()));
        Ok(session)
    }

    /// Stop a session: cancel its timers, release its subscriptions,
    /// and drop the window once nobody watches it.
    pub fn stop_session(&self, id: &str) -> SessionResult<Session> {
        let Some((_, mut entry)) = self.sessions.remove(id) else {
            return Err(SessionError::NotFound(id.to_string()));
        };

        entry.session.status = SessionStatus::Stopped;
        if let Some(handle) = entry.scheduler.take() {
            handle.abort();
        }

        let symbol = entry.session.symbol.clone();
        let timeframe = entry.session.timeframe;
        self.feed.unsubscribe_ticks(&symbol, id);
        self.release_pump(&symbol, timeframe, id);
        self.by_chat.remove(&entry.session.chat_id);

        info!(id, symbol = %symbol, "session stopped");
        self.bus
            .emit(EngineEvent::SessionStopped(entry.session.clone()));
        Ok(entry.session)
    }

    /// Stop every active session (process shutdown).
    pub fn stop_all(&self) {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            let _ = self.stop_session(&id);
        }
    }

    pub fn session_by_chat_id(&self, chat_id: &str) -> Option<Session> {
        let id = self.by_chat.get(chat_id)?;
        self.sessions.get(id.value()).map(|e| e.session.clone())
    }

    pub fn active_sessions_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.session.is_active())
            .count()
    }

    /// Closed candles of a session's window.
    pub fn session_candles(&self, id: &str) -> Vec<Candle> {
        let Some(entry) = self.sessions.get(id) else {
            return Vec::new();
        };
        self.aggregator
            .closed_candles(&entry.session.symbol, entry.session.timeframe)
    }

    /// Run the signal engine on a window without a session, for
    /// diagnostics.
    pub fn debug_signal(&self, symbol: &str, timeframe_secs: i64) -> SessionResult<SignalResult> {
        let timeframe = Timeframe::from_secs(timeframe_secs)
            .ok_or(SessionError::InvalidTimeframe(timeframe_secs))?;
        let closed = self.aggregator.closed_candles(symbol, timeframe);
        let forming = self.aggregator.forming_candle(symbol, timeframe);
        let ticks = self.aggregator.recent_tick_prices(symbol, timeframe);
        let close_time = forming
            .as_ref()
            .map(|f| f.close_epoch())
            .or_else(|| closed.last().map(|c| c.close_epoch()))
            .unwrap_or(0);
        Ok(self.engine.generate_signal(
            "debug",
            symbol,
            timeframe,
            &closed,
            forming.as_ref(),
            &ticks,
            close_time,
            None,
        ))
    }

    /// Start the shared tick pump for a window, or join the existing one.
    fn ensure_pump(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        session_id: &str,
        mut tick_rx: broadcast::Receiver<crate::types::Tick>,
    ) {
        let key = (symbol.to_string(), timeframe);
        if let Some(mut pump) = self.pumps.get_mut(&key) {
            pump.sessions.insert(session_id.to_string());
            return;
        }

        let aggregator = Arc::clone(&self.aggregator);
        let handle = tokio::spawn(async move {
            loop {
                match tick_rx.recv().await {
                    Ok(tick) => aggregator.process_tick(&tick, timeframe),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "tick pump lagged, continuing");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut sessions = HashSet::new();
        sessions.insert(session_id.to_string());
        self.pumps.insert(key, PumpEntry { sessions, handle });
    }

    /// Detach a session from its pump; the last one out stops the pump
    /// and drops the window.
    fn release_pump(&self, symbol: &str, timeframe: Timeframe, session_id: &str) {
        let key = (symbol.to_string(), timeframe);
        let mut drop_window = false;
        if let Some(mut pump) = self.pumps.get_mut(&key) {
            pump.sessions.remove(session_id);
            if pump.sessions.is_empty() {
                pump.handle.abort();
                drop_window = true;
            }
        }
        if drop_window {
            self.pumps.remove(&key);
            self.aggregator.cleanup(symbol, timeframe);
        }
    }

    /// Re-prime all active sessions after a reconnect, and relay
    /// disconnects downstream.
    fn spawn_feed_listener(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        let mut events = self.feed.events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(FeedEvent::Connected) => manager.reprime_sessions().await,
                    Ok(FeedEvent::Disconnected) => {
                        manager.bus.emit(EngineEvent::FeedDisconnected);
                    }
                    Ok(FeedEvent::SymbolError { symbol, message }) => {
                        warn!(symbol = %symbol, message = %message, "feed symbol error");
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    async fn reprime_sessions(&self) {
        let targets: Vec<(String, Timeframe)> = self
            .sessions
            .iter()
            .filter(|e| e.session.is_active())
            .map(|e| (e.session.symbol.clone(), e.session.timeframe))
            .collect();

        // Each distinct window is refreshed once.
        let mut seen = HashSet::new();
        for (symbol, timeframe) in targets {
            if !seen.insert((symbol.clone(), timeframe)) {
                continue;
            }
            match self
                .feed
                .fetch_candle_history(&symbol, timeframe, self.config.signal.history_candles)
                .await
            {
                Ok(history) => {
                    info!(symbol = %symbol, timeframe = %timeframe, "window re-primed after reconnect");
                    self.aggregator.initialize(
                        &symbol,
                        timeframe,
                        history,
                        Some(self.config.signal.window_capacity),
                    );
                }
                Err(e) => {
                    error!(symbol = %symbol, error = %e, "history re-fetch failed after reconnect");
                }
            }
        }
    }

    /// Per-session scheduler: one-shot sleep to each pre-close deadline,
    /// re-armed after every firing; 1s polling while no forming candle
    /// exists; late arms emit immediately, deduped by forming start.
    fn spawn_scheduler(self: &Arc<Self>, id: String) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let Some((symbol, timeframe)) = manager.session_target(&id) else {
                    break;
                };

                let Some(forming) = manager.aggregator.forming_candle(&symbol, timeframe) else {
                    tokio::time::sleep(IDLE_POLL).await;
                    continue;
                };

                let close_time = forming.close_epoch();
                let deadline = close_time - manager.config.signal.pre_close_seconds;
                let now = chrono::Utc::now().timestamp();

                if now < deadline {
                    tokio::time::sleep(Duration::from_secs((deadline - now) as u64)).await;
                    // The forming candle is re-read after the sleep; a
                    // bucket that rolled over meanwhile just moves the
                    // deadline forward.
                    continue;
                }

                let already_emitted = manager
                    .sessions
                    .get(&id)
                    .map(|e| e.last_signal_candle_start == Some(forming.start_epoch))
                    .unwrap_or(true);

                if !already_emitted {
                    manager.fire_signal(&id, &symbol, timeframe, forming.start_epoch, close_time);
                }

                // Wait out the remainder of the bucket, then poll for
                // the next forming candle.
                let remaining = close_time - chrono::Utc::now().timestamp();
                if remaining > 0 {
                    tokio::time::sleep(Duration::from_secs(remaining as u64)).await;
                } else {
                    tokio::time::sleep(IDLE_POLL).await;
                }
            }
            debug!(id = %id, "scheduler stopped");
        })
    }

    fn session_target(&self, id: &str) -> Option<(String, Timeframe)> {
        let entry = self.sessions.get(id)?;
        if !entry.session.is_active() {
            return None;
        }
        Some((entry.session.symbol.clone(), entry.session.timeframe))
    }

    /// Compute and emit one pre-close signal, recording the dedupe mark.
    fn fire_signal(
        &self,
        id: &str,
        symbol: &str,
        timeframe: Timeframe,
        forming_start: i64,
        close_time: i64,
    ) {
        let closed = self.aggregator.closed_candles(symbol, timeframe);
        let forming = self.aggregator.forming_candle(symbol, timeframe);
        let ticks = self.aggregator.recent_tick_prices(symbol, timeframe);

        let Some(mut entry) = self.sessions.get_mut(id) else {
            return;
        };
        // A stop that raced the firing wins.
        if !entry.session.is_active() {
            return;
        }

        let signal = self.engine.generate_signal(
            id,
            symbol,
            timeframe,
            &closed,
            forming.as_ref(),
            &ticks,
            close_time,
            entry.session.options.as_ref(),
        );

        entry.last_signal_candle_start = Some(forming_start);
        entry.session.last_signal_at = Some(signal.timestamp);
        let session = entry.session.clone();
        drop(entry);

        debug!(
            id,
            symbol,
            direction = signal.direction.label(),
            confidence = signal.confidence,
            "pre-close signal"
        );
        self.bus.emit(EngineEvent::PreCloseSignal {
            session,
            signal: Box::new(signal),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedCommand;
    use crate::types::Tick;
    use tokio::sync::mpsc;

    /// Scripted stand-in for the provider: answers every history fetch
    /// with `history_len` flat candles ending just before `now`.
    fn spawn_stub_transport(
        mut commands: mpsc::UnboundedReceiver<FeedCommand>,
        history_len: usize,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(cmd) = commands.recv().await {
                if let FeedCommand::FetchHistory { symbol, timeframe, reply, .. } = cmd {
                    let step = timeframe.secs();
                    let now_bucket = chrono::Utc::now().timestamp().div_euclid(step) * step;
                    let candles: Vec<Candle> = (0..history_len)
                        .map(|i| {
                            let start = now_bucket - (history_len as i64 - i as i64) * step;
                            let tick = Tick::new(symbol.clone(), 100.0, start);
                            Candle::from_tick(&tick, timeframe, start)
                        })
                        .collect();
                    let _ = reply.send(Ok(candles));
                }
            }
        })
    }

    fn manager_with_stub(history_len: usize) -> (Arc<SessionManager>, EventBus) {
        let (feed, commands) = FeedClient::new(Duration::from_secs(1));
        spawn_stub_transport(commands, history_len);
        let aggregator = CandleAggregator::new(500);
        let bus = EventBus::default();
        let manager = SessionManager::new(feed, aggregator, bus.clone(), Config::default());
        (manager, bus)
    }

    #[tokio::test]
    async fn test_start_session_primes_window() {
        let (manager, bus) = manager_with_stub(60);
        let mut events = bus.subscribe();

        let session = manager
            .start_session("s1", "chat-1", "R_100", 60, None)
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(manager.active_sessions_count(), 1);
        assert_eq!(manager.session_candles("s1").len(), 60);
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::SessionStarted(_)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_session_id_conflicts() {
        let (manager, _bus) = manager_with_stub(10);
        manager
            .start_session("s1", "chat-1", "R_100", 60, None)
            .await
            .unwrap();
        let err = manager
            .start_session("s1", "chat-2", "R_100", 60, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unsupported_timeframe_rejected() {
        let (manager, _bus) = manager_with_stub(10);
        let err = manager
            .start_session("s1", "chat-1", "R_100", 90, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTimeframe(90)));
    }

    #[tokio::test]
    async fn test_stop_session_cleans_up() {
        let (manager, bus) = manager_with_stub(10);
        let mut events = bus.subscribe();
        manager
            .start_session("s1", "chat-1", "R_100", 60, None)
            .await
            .unwrap();
        let _ = events.recv().await; // SessionStarted

        let stopped = manager.stop_session("s1").unwrap();
        assert_eq!(stopped.status, SessionStatus::Stopped);
        assert_eq!(manager.active_sessions_count(), 0);
        assert!(manager.session_by_chat_id("chat-1").is_none());
        assert!(manager.session_candles("s1").is_empty());
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::SessionStopped(_)
        ));
    }

    #[tokio::test]
    async fn test_stop_unknown_session() {
        let (manager, _bus) = manager_with_stub(10);
        assert!(matches!(
            manager.stop_session("ghost"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_session_lookup_by_chat() {
        let (manager, _bus) = manager_with_stub(10);
        manager
            .start_session("s1", "chat-7", "R_100", 300, None)
            .await
            .unwrap();
        let session = manager.session_by_chat_id("chat-7").unwrap();
        assert_eq!(session.id, "s1");
        assert_eq!(session.timeframe, Timeframe::M5);
    }

    #[tokio::test]
    async fn test_shared_window_survives_one_stop() {
        let (manager, _bus) = manager_with_stub(10);
        manager
            .start_session("s1", "chat-1", "R_100", 60, None)
            .await
            .unwrap();
        manager
            .start_session("s2", "chat-2", "R_100", 60, None)
            .await
            .unwrap();

        manager.stop_session("s1").unwrap();
        // The second session still sees the window.
        assert_eq!(manager.session_candles("s2").len(), 10);

        manager.stop_session("s2").unwrap();
        assert_eq!(manager.aggregator.window_count(), 0);
    }

    #[tokio::test]
    async fn test_debug_signal_without_session() {
        let (manager, _bus) = manager_with_stub(10);
        let result = manager.debug_signal("R_100", 60).unwrap();
        // No window seeded: well-formed abstention.
        assert_eq!(result.direction, crate::types::SignalDirection::NoTrade);
        assert_eq!(result.closed_candles_count, 0);

        assert!(matches!(
            manager.debug_signal("R_100", 77),
            Err(SessionError::InvalidTimeframe(77))
        ));
    }
}
