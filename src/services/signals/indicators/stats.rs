//! Statistical reads: mean-reversion Z-score, regression slope, range
//! percentile, EMA-ribbon alignment.

use super::ema::ema;
use super::sma::{sma, stddev};
use crate::types::Candle;

/// Z-score of the latest close against the `period` mean.
pub fn zscore(closes: &[f64], period: usize) -> Option<f64> {
    let mean = sma(closes, period)?;
    let sigma = stddev(closes, period)?;
    if sigma == 0.0 {
        return Some(0.0);
    }
    Some((closes.last()? - mean) / sigma)
}

/// Least-squares slope of the last `period` closes, per bar.
pub fn linreg_slope(closes: &[f64], period: usize) -> Option<f64> {
    if period < 2 || closes.len() < period {
        return None;
    }
    let tail = &closes[closes.len() - period..];
    let n = period as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = tail.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in tail.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }

    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// Percentile of the latest candle's range within the last `period`
/// ranges, in [0, 1].
pub fn range_percentile(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let tail = &candles[candles.len() - period..];
    let current = tail.last()?.range();
    let below = tail.iter().filter(|c| c.range() <= current).count();
    Some(below as f64 / period as f64)
}

/// Alignment of the 5/9/12/21/50 EMA ribbon in [-1, 1]: +1 when every
/// faster EMA sits above its slower neighbour, -1 when fully inverted.
pub fn ema_ribbon(closes: &[f64]) -> Option<f64> {
    const PERIODS: [usize; 5] = [5, 9, 12, 21, 50];

    let mut values = Vec::with_capacity(PERIODS.len());
    for period in PERIODS {
        values.push(ema(closes, period)?);
    }

    let pairs = values.len() - 1;
    let mut score = 0i32;
    for pair in values.windows(2) {
        if pair[0] > pair[1] {
            score += 1;
        } else if pair[0] < pair[1] {
            score -= 1;
        }
    }

    Some(f64::from(score) / pairs as f64)
}
