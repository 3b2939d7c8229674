//! Average Directional Index (ADX), Wilder-smoothed.

use super::atr::true_range;
use crate::types::Candle;

/// ADX over the candle series. Needs `2·period + 1` candles for a
/// meaningful DX average.
pub fn adx(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < 2 * period + 1 {
        return None;
    }

    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    let mut trs = Vec::with_capacity(candles.len() - 1);

    for pair in candles.windows(2) {
        let up_move = pair[1].high - pair[0].high;
        let down_move = pair[0].low - pair[1].low;
        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
        trs.push(true_range(&pair[1], &pair[0]));
    }

    // Wilder-smoothed running sums.
    let mut smoothed_plus: f64 = plus_dm.iter().take(period).sum();
    let mut smoothed_minus: f64 = minus_dm.iter().take(period).sum();
    let mut smoothed_tr: f64 = trs.iter().take(period).sum();

    let mut dx_values = Vec::new();

    let di_dx = |plus: f64, minus: f64, tr: f64| -> f64 {
        if tr == 0.0 {
            return 0.0;
        }
        let plus_di = plus / tr * 100.0;
        let minus_di = minus / tr * 100.0;
        let sum = plus_di + minus_di;
        if sum == 0.0 {
            0.0
        } else {
            (plus_di - minus_di).abs() / sum * 100.0
        }
    };

    dx_values.push(di_dx(smoothed_plus, smoothed_minus, smoothed_tr));

    for i in period..trs.len() {
        smoothed_plus = smoothed_plus - smoothed_plus / period as f64 + plus_dm[i];
        smoothed_minus = smoothed_minus - smoothed_minus / period as f64 + minus_dm[i];
        smoothed_tr = smoothed_tr - smoothed_tr / period as f64 + trs[i];
        dx_values.push(di_dx(smoothed_plus, smoothed_minus, smoothed_tr));
    }

    if dx_values.len() < period {
        return None;
    }

    // ADX: Wilder average of DX.
    let mut value: f64 = dx_values.iter().take(period).sum::<f64>() / period as f64;
    for dx in dx_values.iter().skip(period) {
        value = (value * (period - 1) as f64 + dx) / period as f64;
    }

    Some(value)
}
