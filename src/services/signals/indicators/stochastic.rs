//! Stochastic oscillator %K(14,3) / %D(3).

use crate::types::{Candle, StochasticOutput};

const LOOKBACK: usize = 14;
const SMOOTH_K: usize = 3;
const SMOOTH_D: usize = 3;

fn raw_k(candles: &[Candle]) -> Option<f64> {
    if candles.len() < LOOKBACK {
        return None;
    }
    let tail = &candles[candles.len() - LOOKBACK..];
    let highest = tail.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lowest = tail.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let close = tail.last()?.close;

    if highest == lowest {
        return Some(50.0);
    }
    Some((close - lowest) / (highest - lowest) * 100.0)
}

/// Smoothed %K and %D for the latest candle.
pub fn stochastic(candles: &[Candle]) -> Option<StochasticOutput> {
    let needed = LOOKBACK + SMOOTH_K + SMOOTH_D - 2;
    if candles.len() < needed {
        return None;
    }

    // Raw %K for the last SMOOTH_K + SMOOTH_D - 1 positions.
    let positions = SMOOTH_K + SMOOTH_D - 1;
    let mut raw = Vec::with_capacity(positions);
    for offset in (0..positions).rev() {
        raw.push(raw_k(&candles[..candles.len() - offset])?);
    }

    let mut smoothed = Vec::with_capacity(SMOOTH_D);
    for window in raw.windows(SMOOTH_K) {
        smoothed.push(window.iter().sum::<f64>() / SMOOTH_K as f64);
    }

    let k = *smoothed.last()?;
    let d = smoothed.iter().sum::<f64>() / smoothed.len() as f64;

    Some(StochasticOutput { k, d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timeframe;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                symbol: "R_100".to_string(),
                timeframe_secs: Timeframe::M1.secs(),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                start_epoch: i as i64 * 60,
                tick_count: 10,
                is_forming: false,
            })
            .collect()
    }

    #[test]
    fn test_stochastic_insufficient_data() {
        let candles = candles_from_closes(&[100.0; 10]);
        assert!(stochastic(&candles).is_none());
    }

    #[test]
    fn test_stochastic_high_in_uptrend() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let output = stochastic(&candles_from_closes(&closes)).unwrap();
        assert!(output.k > 80.0, "%K should be high in an uptrend, got {}", output.k);
    }

    #[test]
    fn test_stochastic_low_in_downtrend() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
        let output = stochastic(&candles_from_closes(&closes)).unwrap();
        assert!(output.k < 20.0, "%K should be low in a downtrend, got {}", output.k);
    }

    #[test]
    fn test_stochastic_bounded() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + (i as f64 * 0.9).sin() * 4.0)
            .collect();
        let output = stochastic(&candles_from_closes(&closes)).unwrap();
        assert!((0.0..=100.0).contains(&output.k));
        assert!((0.0..=100.0).contains(&output.d));
    }

    #[test]
    fn test_stochastic_flat_range_is_midpoint() {
        let candles: Vec<Candle> = (0..30)
            .map(|i| Candle {
                symbol: "R_100".to_string(),
                timeframe_secs: 60,
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                start_epoch: i as i64 * 60,
                tick_count: 1,
                is_forming: false,
            })
            .collect();
        let output = stochastic(&candles).unwrap();
        assert_eq!(output.k, 50.0);
    }
}
