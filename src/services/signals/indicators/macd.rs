//! Moving Average Convergence Divergence (MACD 12/26/9).

use super::ema::ema_series;
use crate::types::MacdOutput;

const FAST: usize = 12;
const SLOW: usize = 26;
const SIGNAL: usize = 9;

/// MACD line, signal line and histogram for the latest close.
pub fn macd(closes: &[f64]) -> Option<MacdOutput> {
    if closes.len() < SLOW + SIGNAL - 1 {
        return None;
    }

    let fast = ema_series(closes, FAST)?;
    let slow = ema_series(closes, SLOW)?;

    // Align the two EMA series on the slow seed; the fast series is longer.
    let offset = fast.len() - slow.len();
    let macd_line: Vec<f64> = slow
        .iter()
        .enumerate()
        .map(|(i, s)| fast[i + offset] - s)
        .collect();

    let signal_series = ema_series(&macd_line, SIGNAL)?;
    let macd_value = *macd_line.last()?;
    let signal_value = *signal_series.last()?;

    Some(MacdOutput {
        macd: macd_value,
        signal: signal_value,
        histogram: macd_value - signal_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_insufficient_data() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        assert!(macd(&closes).is_none());
    }

    #[test]
    fn test_macd_constant_series_is_zero() {
        let closes = vec![100.0; 60];
        let output = macd(&closes).unwrap();
        assert!(output.macd.abs() < 1e-9);
        assert!(output.signal.abs() < 1e-9);
        assert!(output.histogram.abs() < 1e-9);
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64 * 0.8).collect();
        let output = macd(&closes).unwrap();
        assert!(output.macd > 0.0, "MACD should be positive in an uptrend");
    }

    #[test]
    fn test_macd_histogram_identity() {
        let closes: Vec<f64> = (0..80)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0)
            .collect();
        let output = macd(&closes).unwrap();
        assert!((output.histogram - (output.macd - output.signal)).abs() < 1e-12);
    }
}
