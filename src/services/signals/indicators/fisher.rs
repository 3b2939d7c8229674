//! Fisher Transform (10).

use crate::types::Candle;

/// Fisher transform of price position within the rolling `period` range.
pub fn fisher(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let mut value = 0.0;
    let mut fish = 0.0;

    for i in (period - 1)..candles.len() {
        let window = &candles[i + 1 - period..=i];
        let highest = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let mid = (candles[i].high + candles[i].low) / 2.0;

        let position = if highest == lowest {
            0.0
        } else {
            2.0 * ((mid - lowest) / (highest - lowest)) - 1.0
        };

        // Smooth and clamp away from the asymptotes.
        value = (0.33 * position + 0.67 * value).clamp(-0.999, 0.999);
        fish = 0.5 * ((1.0 + value) / (1.0 - value)).ln() + 0.5 * fish;
    }

    Some(fish)
}
