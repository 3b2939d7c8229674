//! Typed downstream event bus.
//!
//! Subscribers (chat front-end, persistence sink, loggers) receive engine
//! lifecycle and signal events over a broadcast channel; a lagging or
//! absent subscriber never blocks emission.

use crate::types::{Session, SignalResult};
use tokio::sync::broadcast;

/// Events emitted by the engine to external collaborators.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Fired a few seconds before a candle closes.
    PreCloseSignal {
        session: Session,
        signal: Box<SignalResult>,
    },
    SessionStarted(Session),
    SessionStopped(Session),
    FeedDisconnected,
}

/// Broadcast bus for [`EngineEvent`].
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; dropped silently when nobody listens.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
