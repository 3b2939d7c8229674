//! Hull Moving Average (HMA).

/// Weighted moving average of the last `period` values, newest weighted
/// heaviest.
fn wma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let tail = &values[values.len() - period..];
    let mut weighted = 0.0;
    for (i, value) in tail.iter().enumerate() {
        weighted += value * (i + 1) as f64;
    }
    let denom = (period * (period + 1)) as f64 / 2.0;
    Some(weighted / denom)
}

/// HMA(period): WMA(sqrt(period)) of `2·WMA(period/2) − WMA(period)`.
pub fn hull(closes: &[f64], period: usize) -> Option<f64> {
    if period < 2 {
        return None;
    }
    let half = period / 2;
    let sqrt_period = (period as f64).sqrt().round().max(1.0) as usize;

    if closes.len() < period + sqrt_period - 1 {
        return None;
    }

    // Build the raw series over the last sqrt_period positions.
    let mut raw = Vec::with_capacity(sqrt_period);
    for offset in (0..sqrt_period).rev() {
        let end = closes.len() - offset;
        let window = &closes[..end];
        let fast = wma(window, half)?;
        let slow = wma(window, period)?;
        raw.push(2.0 * fast - slow);
    }

    wma(&raw, sqrt_period)
}
