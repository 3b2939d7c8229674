//! Bollinger Bands (20, 2σ).

use super::sma::{sma, stddev};
use crate::types::BandOutput;

/// Bands at `SMA(period) ± mult·σ(period)`.
pub fn bollinger(closes: &[f64], period: usize, mult: f64) -> Option<BandOutput> {
    let middle = sma(closes, period)?;
    let sigma = stddev(closes, period)?;
    Some(BandOutput {
        upper: middle + mult * sigma,
        middle,
        lower: middle - mult * sigma,
    })
}

/// Band width relative to the middle band, in [0, ∞).
pub fn bandwidth(bands: &BandOutput) -> f64 {
    if bands.middle == 0.0 {
        return 0.0;
    }
    (bands.upper - bands.lower) / bands.middle
}
