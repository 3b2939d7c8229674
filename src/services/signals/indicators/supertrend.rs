//! SuperTrend (10, 3).

use super::atr::true_range;
use crate::types::{Candle, SuperTrendOutput, TrendDirection};

/// SuperTrend line and direction for the latest candle.
///
/// Walks the whole series to carry the band ratchet and flip state forward.
pub fn supertrend(candles: &[Candle], period: usize, mult: f64) -> Option<SuperTrendOutput> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    // Rolling Wilder ATR alongside the walk.
    let mut trs = Vec::with_capacity(candles.len() - 1);
    for pair in candles.windows(2) {
        trs.push(true_range(&pair[1], &pair[0]));
    }

    let mut atr_value: f64 = trs.iter().take(period).sum::<f64>() / period as f64;

    // Bands start at the first candle with a full ATR behind it.
    let start = period;
    let first = &candles[start];
    let hl2 = (first.high + first.low) / 2.0;
    let mut upper = hl2 + mult * atr_value;
    let mut lower = hl2 - mult * atr_value;
    let mut direction = if first.close > hl2 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    for i in (start + 1)..candles.len() {
        atr_value = (atr_value * (period - 1) as f64 + trs[i - 1]) / period as f64;

        let candle = &candles[i];
        let hl2 = (candle.high + candle.low) / 2.0;
        let basic_upper = hl2 + mult * atr_value;
        let basic_lower = hl2 - mult * atr_value;
        let prev_close = candles[i - 1].close;

        // Bands only ratchet in the trend's favour.
        upper = if basic_upper < upper || prev_close > upper {
            basic_upper
        } else {
            upper
        };
        lower = if basic_lower > lower || prev_close < lower {
            basic_lower
        } else {
            lower
        };

        direction = match direction {
            TrendDirection::Up if candle.close < lower => TrendDirection::Down,
            TrendDirection::Down if candle.close > upper => TrendDirection::Up,
            d => d,
        };
    }

    let value = match direction {
        TrendDirection::Up => lower,
        TrendDirection::Down => upper,
    };

    Some(SuperTrendOutput { value, direction })
}
