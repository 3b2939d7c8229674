//! Commodity Channel Index (CCI).

use crate::types::Candle;

/// CCI over the last `period` candles.
pub fn cci(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let tail = &candles[candles.len() - period..];

    let typical: Vec<f64> = tail
        .iter()
        .map(|c| (c.high + c.low + c.close) / 3.0)
        .collect();
    let mean = typical.iter().sum::<f64>() / period as f64;
    let mean_deviation = typical.iter().map(|t| (t - mean).abs()).sum::<f64>() / period as f64;

    if mean_deviation == 0.0 {
        return Some(0.0);
    }

    let last = *typical.last()?;
    Some((last - mean) / (0.015 * mean_deviation))
}
