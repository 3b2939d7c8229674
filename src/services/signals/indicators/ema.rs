//! Exponential Moving Average (EMA).

/// EMA over the full close series, seeded with the SMA of the first
/// `period` values. Returns the running series from the seed onward.
pub fn ema_series(closes: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let seed: f64 = closes.iter().take(period).sum::<f64>() / period as f64;
    let k = 2.0 / (period as f64 + 1.0);

    let mut series = Vec::with_capacity(closes.len() - period + 1);
    let mut current = seed;
    series.push(current);

    for close in &closes[period..] {
        current = (close - current) * k + current;
        series.push(current);
    }

    Some(series)
}

/// Latest EMA value.
pub fn ema(closes: &[f64], period: usize) -> Option<f64> {
    ema_series(closes, period).and_then(|s| s.last().copied())
}
