//! Keltner Channels (20, 2·ATR).

use super::atr::atr;
use super::ema::ema;
use crate::types::{BandOutput, Candle};

/// Channels at `EMA(period) ± mult·ATR(period)` of the close series.
pub fn keltner(candles: &[Candle], period: usize, mult: f64) -> Option<BandOutput> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let middle = ema(&closes, period)?;
    let range = atr(candles, period)?;
    Some(BandOutput {
        upper: middle + mult * range,
        middle,
        lower: middle - mult * range,
    })
}
