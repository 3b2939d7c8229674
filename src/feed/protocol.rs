//! Feed wire envelope.
//!
//! The provider speaks request/response plus streaming subscriptions over
//! one duplex channel. Requests carry a `req_id` echoed in the matching
//! response; ticks arrive unsolicited once a symbol is subscribed.

use crate::types::{Candle, Timeframe};
use serde::{Deserialize, Serialize};

/// Outbound request body.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FeedRequest {
    SubscribeTicks { symbol: String },
    UnsubscribeTicks { symbol: String },
    CandleHistory {
        symbol: String,
        granularity: i64,
        count: usize,
    },
    Ping,
}

/// Outbound envelope with correlation id.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestEnvelope {
    pub req_id: u64,
    #[serde(flatten)]
    pub request: FeedRequest,
}

/// A candle as the provider ships it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WireCandle {
    pub epoch: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Ticks folded into the bucket; absent for providers that do not
    /// report it.
    #[serde(default)]
    pub ticks: Option<u32>,
}

impl WireCandle {
    /// Convert into a closed engine candle.
    pub fn into_candle(self, symbol: &str, timeframe: Timeframe) -> Candle {
        Candle {
            symbol: symbol.to_string(),
            timeframe_secs: timeframe.secs(),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            start_epoch: self.epoch,
            tick_count: self.ticks.unwrap_or(1).max(1),
            is_forming: false,
        }
    }
}

/// Inbound message body.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum FeedMessage {
    Tick {
        symbol: String,
        price: f64,
        epoch: i64,
    },
    Candles {
        req_id: u64,
        candles: Vec<WireCandle>,
    },
    Subscribed {
        req_id: u64,
        symbol: String,
    },
    Error {
        #[serde(default)]
        req_id: Option<u64>,
        #[serde(default)]
        symbol: Option<String>,
        message: String,
    },
    Pong {
        req_id: u64,
    },
}
