//! Williams %R.

use crate::types::Candle;

/// Williams %R over the last `period` candles, in [-100, 0].
pub fn williams_r(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let tail = &candles[candles.len() - period..];
    let highest = tail.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lowest = tail.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let close = tail.last()?.close;

    if highest == lowest {
        return Some(-50.0);
    }
    Some((highest - close) / (highest - lowest) * -100.0)
}
