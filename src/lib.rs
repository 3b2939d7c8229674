//! Wraith - real-time algorithmic signal engine.
//!
//! Ingests live market ticks, buckets them into candles per (symbol,
//! timeframe), computes a catalogue of technical indicators and
//! candlestick psychology features, and emits a weighted CALL/PUT/
//! NO_TRADE decision a few seconds before each candle closes.

pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod services;
pub mod types;

pub use config::{Config, SignalConfig, VolatilityConfig};
pub use error::{FeedError, SessionError};
pub use events::{EngineEvent, EventBus};
pub use feed::FeedClient;
pub use services::{CandleAggregator, SessionManager, SignalEngine};
