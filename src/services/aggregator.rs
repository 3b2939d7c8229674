//! Tick-to-candle aggregation.
//!
//! Owns one `CandleWindow` per (symbol, timeframe): a bounded ring of
//! closed candles plus at most one forming candle. Mutation is serialised
//! per window by the map's entry lock; getters hand out copies.

use crate::types::{Candle, Tick, Timeframe};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Forming-candle tick prices retained for tick-scale volatility.
const TICK_TAIL_CAPACITY: usize = 32;

/// Rolling window of candles for one (symbol, timeframe).
#[derive(Debug)]
struct CandleWindow {
    closed: VecDeque<Candle>,
    forming: Option<Candle>,
    /// Recent tick prices of the forming bucket, newest last.
    tick_tail: VecDeque<f64>,
    capacity: usize,
}

impl CandleWindow {
    fn new(capacity: usize) -> Self {
        Self {
            closed: VecDeque::with_capacity(capacity),
            forming: None,
            tick_tail: VecDeque::with_capacity(TICK_TAIL_CAPACITY),
            capacity,
        }
    }

    fn push_closed(&mut self, candle: Candle) {
        self.closed.push_back(candle);
        while self.closed.len() > self.capacity {
            self.closed.pop_front();
        }
    }

    fn push_tick_price(&mut self, price: f64) {
        self.tick_tail.push_back(price);
        while self.tick_tail.len() > TICK_TAIL_CAPACITY {
            self.tick_tail.pop_front();
        }
    }
}

/// Per-(symbol, timeframe) candle aggregation.
pub struct CandleAggregator {
    windows: DashMap<(String, Timeframe), CandleWindow>,
    default_capacity: usize,
    malformed_ticks: AtomicU64,
}

impl CandleAggregator {
    pub fn new(default_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            windows: DashMap::new(),
            default_capacity,
            malformed_ticks: AtomicU64::new(0),
        })
    }

    /// Seed a window from fetched history. Any prior forming candle is
    /// cleared; the ring keeps the newest candles when history exceeds
    /// capacity.
    pub fn initialize(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        history: Vec<Candle>,
        capacity: Option<usize>,
    ) {
        let capacity = capacity.unwrap_or(self.default_capacity);
        let mut window = CandleWindow::new(capacity);
        for mut candle in history {
            candle.is_forming = false;
            window.push_closed(candle);
        }
        debug!(
            symbol,
            timeframe = %timeframe,
            candles = window.closed.len(),
            "window seeded"
        );
        self.windows
            .insert((symbol.to_string(), timeframe), window);
    }

    /// Fold one tick into the window, closing the forming candle at
    /// bucket boundaries. A tick exactly at `bucket + timeframe` starts
    /// the next bucket; out-of-order ticks are dropped.
    pub fn process_tick(&self, tick: &Tick, timeframe: Timeframe) {
        if !tick.is_valid() {
            self.malformed_ticks.fetch_add(1, Ordering::Relaxed);
            warn!(symbol = %tick.symbol, price = tick.price, "malformed tick dropped");
            return;
        }

        let step = timeframe.secs();
        let bucket = tick.epoch.div_euclid(step) * step;

        let mut window = self
            .windows
            .entry((tick.symbol.clone(), timeframe))
            .or_insert_with(|| CandleWindow::new(self.default_capacity));

        // A tick at or before the last closed candle's bucket is stale.
        if let Some(last_closed) = window.closed.back() {
            if bucket <= last_closed.start_epoch && window.forming.is_none() {
                return;
            }
        }

        match window.forming.take() {
            None => {
                window.forming = Some(Candle::from_tick(tick, timeframe, bucket));
                window.tick_tail.clear();
                window.push_tick_price(tick.price);
            }
            Some(mut forming) if bucket == forming.start_epoch => {
                forming.apply_tick(tick.price);
                window.forming = Some(forming);
                window.push_tick_price(tick.price);
            }
            Some(mut forming) if bucket > forming.start_epoch => {
                forming.is_forming = false;
                window.push_closed(forming);
                window.forming = Some(Candle::from_tick(tick, timeframe, bucket));
                window.tick_tail.clear();
                window.push_tick_price(tick.price);
            }
            // Out-of-order tick for an earlier bucket.
            Some(forming) => {
                window.forming = Some(forming);
            }
        }
    }

    /// Snapshot of closed candles, oldest first.
    pub fn closed_candles(&self, symbol: &str, timeframe: Timeframe) -> Vec<Candle> {
        self.windows
            .get(&(symbol.to_string(), timeframe))
            .map(|w| w.closed.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the forming candle, if any.
    pub fn forming_candle(&self, symbol: &str, timeframe: Timeframe) -> Option<Candle> {
        self.windows
            .get(&(symbol.to_string(), timeframe))
            .and_then(|w| w.forming.clone())
    }

    /// Recent tick prices of the forming bucket, oldest first.
    pub fn recent_tick_prices(&self, symbol: &str, timeframe: Timeframe) -> Vec<f64> {
        self.windows
            .get(&(symbol.to_string(), timeframe))
            .map(|w| w.tick_tail.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop the window for a (symbol, timeframe).
    pub fn cleanup(&self, symbol: &str, timeframe: Timeframe) {
        self.windows.remove(&(symbol.to_string(), timeframe));
    }

    /// Number of live windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Ticks dropped as malformed since startup.
    pub fn malformed_tick_count(&self) -> u64 {
        self.malformed_ticks.load(Ordering::Relaxed)
    }
}
