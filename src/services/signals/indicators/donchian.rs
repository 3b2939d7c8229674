//! Donchian Channels (20).

use crate::types::{Candle, ChannelOutput};

/// Highest high and lowest low over the last `period` candles.
pub fn donchian(candles: &[Candle], period: usize) -> Option<ChannelOutput> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let tail = &candles[candles.len() - period..];
    Some(ChannelOutput {
        upper: tail.iter().map(|c| c.high).fold(f64::MIN, f64::max),
        lower: tail.iter().map(|c| c.low).fold(f64::MAX, f64::min),
    })
}
