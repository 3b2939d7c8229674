//! Average True Range (ATR), Wilder-smoothed, plus ATR bands.

use crate::types::{Candle, ChannelOutput};

/// True range of `current` given the previous candle.
pub fn true_range(current: &Candle, previous: &Candle) -> f64 {
    let hl = current.high - current.low;
    let hc = (current.high - previous.close).abs();
    let lc = (current.low - previous.close).abs();
    hl.max(hc).max(lc)
}

/// ATR over the candle series. Needs `period + 1` candles.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let mut true_ranges = Vec::with_capacity(candles.len() - 1);
    for pair in candles.windows(2) {
        true_ranges.push(true_range(&pair[1], &pair[0]));
    }

    let mut value: f64 = true_ranges.iter().take(period).sum::<f64>() / period as f64;
    for tr in true_ranges.iter().skip(period) {
        value = (value * (period - 1) as f64 + tr) / period as f64;
    }

    Some(value)
}

/// Bands at `close ± mult·ATR(period)`.
pub fn atr_bands(candles: &[Candle], period: usize, mult: f64) -> Option<ChannelOutput> {
    let value = atr(candles, period)?;
    let close = candles.last()?.close;
    Some(ChannelOutput {
        upper: close + mult * value,
        lower: close - mult * value,
    })
}
