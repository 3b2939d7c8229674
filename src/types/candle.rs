use serde::{Deserialize, Serialize};
use std::fmt;

/// A single price observation from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    /// Unix epoch in seconds.
    pub epoch: i64,
}

impl Tick {
    pub fn new(symbol: impl Into<String>, price: f64, epoch: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            epoch,
        }
    }

    /// A tick is usable when its price is a finite positive number.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.epoch > 0
    }
}

/// Supported candle timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    M1,
    M2,
    M5,
    M15,
    M30,
    H1,
}

impl Timeframe {
    /// All supported timeframes, shortest first.
    pub const ALL: &'static [Timeframe] = &[
        Timeframe::M1,
        Timeframe::M2,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
    ];

    /// Parse from a span in seconds. Any other span is unsupported.
    pub fn from_secs(secs: i64) -> Option<Self> {
        match secs {
            60 => Some(Self::M1),
            120 => Some(Self::M2),
            300 => Some(Self::M5),
            900 => Some(Self::M15),
            1800 => Some(Self::M30),
            3600 => Some(Self::H1),
            _ => None,
        }
    }

    /// Span in seconds.
    pub fn secs(&self) -> i64 {
        match self {
            Self::M1 => 60,
            Self::M2 => 120,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::M30 => 1800,
            Self::H1 => 3600,
        }
    }

    /// Short display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M2 => "2m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A time-bucketed OHLC candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub symbol: String,
    pub timeframe_secs: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Bucket start, a multiple of `timeframe_secs`.
    pub start_epoch: i64,
    pub tick_count: u32,
    pub is_forming: bool,
}

impl Candle {
    /// Open a fresh candle from the first tick of a bucket.
    pub fn from_tick(tick: &Tick, timeframe: Timeframe, start_epoch: i64) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            timeframe_secs: timeframe.secs(),
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            start_epoch,
            tick_count: 1,
            is_forming: true,
        }
    }

    /// Fold another tick of the same bucket into this candle.
    pub fn apply_tick(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.tick_count += 1;
    }

    /// Epoch at which this candle's bucket ends.
    pub fn close_epoch(&self) -> i64 {
        self.start_epoch + self.timeframe_secs
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Absolute body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Volume proxy: the feed carries no per-tick size, so tick count
    /// stands in for volume in the volume-family indicators.
    pub fn volume(&self) -> f64 {
        f64::from(self.tick_count)
    }
}
