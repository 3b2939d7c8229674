//! Volume-family indicators: VWAP, OBV, Chaikin oscillator.
//!
//! The feed carries no per-tick size, so candle tick counts stand in for
//! volume throughout.

use super::ema::ema_series;
use crate::types::Candle;

/// Volume-weighted average price over the whole window (no day reset).
pub fn vwap(candles: &[Candle]) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }

    let mut weighted = 0.0;
    let mut total_volume = 0.0;
    for candle in candles {
        let typical = (candle.high + candle.low + candle.close) / 3.0;
        weighted += typical * candle.volume();
        total_volume += candle.volume();
    }

    if total_volume == 0.0 {
        return None;
    }
    Some(weighted / total_volume)
}

/// On-balance volume: running volume sum signed by close direction.
pub fn obv(candles: &[Candle]) -> Option<f64> {
    if candles.len() < 2 {
        return None;
    }

    let mut value = 0.0;
    for pair in candles.windows(2) {
        if pair[1].close > pair[0].close {
            value += pair[1].volume();
        } else if pair[1].close < pair[0].close {
            value -= pair[1].volume();
        }
    }
    Some(value)
}

/// Accumulation/distribution line.
fn adl_series(candles: &[Candle]) -> Vec<f64> {
    let mut series = Vec::with_capacity(candles.len());
    let mut running = 0.0;
    for candle in candles {
        let range = candle.range();
        let clv = if range == 0.0 {
            0.0
        } else {
            ((candle.close - candle.low) - (candle.high - candle.close)) / range
        };
        running += clv * candle.volume();
        series.push(running);
    }
    series
}

/// Chaikin oscillator: EMA(3) minus EMA(10) of the A/D line.
pub fn chaikin(candles: &[Candle]) -> Option<f64> {
    if candles.len() < 10 {
        return None;
    }
    let adl = adl_series(candles);
    let fast = ema_series(&adl, 3)?;
    let slow = ema_series(&adl, 10)?;
    Some(fast.last()? - slow.last()?)
}
