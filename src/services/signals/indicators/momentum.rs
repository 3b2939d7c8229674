//! Rate of Change and raw Momentum.

/// Percent change against the close `period` bars back.
pub fn roc(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let current = *closes.last()?;
    let past = closes[closes.len() - 1 - period];
    if past == 0.0 {
        return None;
    }
    Some((current - past) / past * 100.0)
}

/// Raw difference against the close `period` bars back.
pub fn momentum(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let current = *closes.last()?;
    let past = closes[closes.len() - 1 - period];
    Some(current - past)
}
