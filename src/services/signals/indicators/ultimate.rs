//! Ultimate Oscillator (7, 14, 28).

use crate::types::Candle;

const SHORT: usize = 7;
const MEDIUM: usize = 14;
const LONG: usize = 28;

/// Ultimate oscillator in [0, 100]. Needs `LONG + 1` candles.
pub fn ultimate(candles: &[Candle]) -> Option<f64> {
    if candles.len() < LONG + 1 {
        return None;
    }

    let mut buying_pressure = Vec::with_capacity(candles.len() - 1);
    let mut true_ranges = Vec::with_capacity(candles.len() - 1);

    for pair in candles.windows(2) {
        let prev_close = pair[0].close;
        let low = pair[1].low.min(prev_close);
        let high = pair[1].high.max(prev_close);
        buying_pressure.push(pair[1].close - low);
        true_ranges.push(high - low);
    }

    let average = |period: usize| -> f64 {
        let bp: f64 = buying_pressure.iter().rev().take(period).sum();
        let tr: f64 = true_ranges.iter().rev().take(period).sum();
        if tr == 0.0 {
            0.5
        } else {
            bp / tr
        }
    };

    let short = average(SHORT);
    let medium = average(MEDIUM);
    let long = average(LONG);

    Some(100.0 * (4.0 * short + 2.0 * medium + long) / 7.0)
}
