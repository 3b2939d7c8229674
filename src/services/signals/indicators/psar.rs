//! Parabolic SAR (0.02 step, 0.2 max).

use crate::types::Candle;

/// Parabolic stop-and-reverse for the latest candle.
pub fn psar(candles: &[Candle], step: f64, max_step: f64) -> Option<f64> {
    if candles.len() < 2 {
        return None;
    }

    let mut uptrend = candles[1].close >= candles[0].close;
    let mut sar = if uptrend {
        candles[0].low
    } else {
        candles[0].high
    };
    let mut extreme = if uptrend {
        candles[0].high
    } else {
        candles[0].low
    };
    let mut af = step;

    for i in 1..candles.len() {
        let candle = &candles[i];
        sar += af * (extreme - sar);

        if uptrend {
            // SAR never enters the prior two lows.
            sar = sar.min(candles[i - 1].low);
            if i >= 2 {
                sar = sar.min(candles[i - 2].low);
            }

            if candle.low < sar {
                uptrend = false;
                sar = extreme;
                extreme = candle.low;
                af = step;
            } else if candle.high > extreme {
                extreme = candle.high;
                af = (af + step).min(max_step);
            }
        } else {
            sar = sar.max(candles[i - 1].high);
            if i >= 2 {
                sar = sar.max(candles[i - 2].high);
            }

            if candle.high > sar {
                uptrend = true;
                sar = extreme;
                extreme = candle.high;
                af = step;
            } else if candle.low < extreme {
                extreme = candle.low;
                af = (af + step).min(max_step);
            }
        }
    }

    Some(sar)
}
