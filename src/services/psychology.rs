//! Candlestick psychology: candle anatomy, pattern detection, bias,
//! order-block probability and fair-value-gap detection.

use crate::types::{Candle, CandlestickPattern, MarketBias, PatternType, PsychologyAnalysis};

/// Body below this share of the range reads as a doji.
const DOJI_BODY_RATIO: f64 = 0.1;
/// Candles of local context examined for multi-bar patterns.
const ORDER_BLOCK_LOOKBACK: usize = 6;

/// Analyze the most recent price action of the series.
///
/// The last candle (forming if present, else last closed) carries the
/// anatomy read; the preceding candles supply context for multi-bar
/// patterns.
pub fn analyze(closed: &[Candle], forming: Option<&Candle>) -> PsychologyAnalysis {
    let mut series: Vec<&Candle> = closed.iter().collect();
    if let Some(candle) = forming {
        series.push(candle);
    }

    let Some(last) = series.last().copied() else {
        return PsychologyAnalysis::default();
    };

    let range = last.range();
    let (body_ratio, upper_wick_ratio, lower_wick_ratio) = if range == 0.0 {
        (0.0, 0.0, 0.0)
    } else {
        (
            last.body() / range,
            (last.high - last.open.max(last.close)) / range,
            (last.open.min(last.close) - last.low) / range,
        )
    };
    let is_doji = body_ratio < DOJI_BODY_RATIO;

    let mut patterns = Vec::new();
    if let Some(previous) = series.len().checked_sub(2).map(|i| series[i]) {
        detect_engulfing(last, previous, &mut patterns);
    }
    detect_hammer(last, body_ratio, upper_wick_ratio, lower_wick_ratio, &mut patterns);
    detect_shooting_star(last, body_ratio, upper_wick_ratio, lower_wick_ratio, &mut patterns);
    if is_doji && range > 0.0 {
        patterns.push(CandlestickPattern::new(
            "doji",
            PatternType::Neutral,
            1.0 - body_ratio / DOJI_BODY_RATIO,
            "body under 10% of range, market indecision",
        ));
    }

    PsychologyAnalysis {
        body_ratio,
        upper_wick_ratio,
        lower_wick_ratio,
        is_doji,
        patterns,
        bias: read_bias(last),
        order_block_probability: order_block_probability(&series),
        fvg_detected: detect_fvg(&series),
    }
}

/// Bullish when the close lands in the upper third of the range with a
/// bullish body; bearish symmetric; neutral otherwise.
fn read_bias(candle: &Candle) -> MarketBias {
    let range = candle.range();
    if range == 0.0 {
        return MarketBias::Neutral;
    }
    let close_position = (candle.close - candle.low) / range;
    if close_position > 2.0 / 3.0 && candle.is_bullish() {
        MarketBias::Bullish
    } else if close_position < 1.0 / 3.0 && candle.is_bearish() {
        MarketBias::Bearish
    } else {
        MarketBias::Neutral
    }
}

/// Current body fully engulfs the previous opposite-colour body.
fn detect_engulfing(current: &Candle, previous: &Candle, patterns: &mut Vec<CandlestickPattern>) {
    if previous.body() == 0.0 || current.body() == 0.0 {
        return;
    }

    let engulfs = current.open.min(current.close) <= previous.open.min(previous.close)
        && current.open.max(current.close) >= previous.open.max(previous.close);
    if !engulfs {
        return;
    }

    let strength = (previous.body() / current.body()).min(1.0);
    if current.is_bullish() && previous.is_bearish() {
        patterns.push(CandlestickPattern::new(
            "bullish_engulfing",
            PatternType::Bullish,
            strength,
            "bullish body engulfs prior bearish body",
        ));
    } else if current.is_bearish() && previous.is_bullish() {
        patterns.push(CandlestickPattern::new(
            "bearish_engulfing",
            PatternType::Bearish,
            strength,
            "bearish body engulfs prior bullish body",
        ));
    }
}

/// Small body near the top with a long lower wick.
fn detect_hammer(
    candle: &Candle,
    body_ratio: f64,
    upper_wick_ratio: f64,
    lower_wick_ratio: f64,
    patterns: &mut Vec<CandlestickPattern>,
) {
    if candle.range() == 0.0 || candle.body() == 0.0 {
        return;
    }
    let lower_wick = candle.open.min(candle.close) - candle.low;
    if lower_wick >= 2.0 * candle.body() && upper_wick_ratio < 0.15 && body_ratio < 0.4 {
        patterns.push(CandlestickPattern::new(
            "hammer",
            PatternType::Bullish,
            lower_wick_ratio.min(1.0),
            "long lower wick rejection, buyers defended the low",
        ));
    }
}

/// Mirror of the hammer: small body near the bottom, long upper wick.
fn detect_shooting_star(
    candle: &Candle,
    body_ratio: f64,
    upper_wick_ratio: f64,
    lower_wick_ratio: f64,
    patterns: &mut Vec<CandlestickPattern>,
) {
    if candle.range() == 0.0 || candle.body() == 0.0 {
        return;
    }
    let upper_wick = candle.high - candle.open.max(candle.close);
    if upper_wick >= 2.0 * candle.body() && lower_wick_ratio < 0.15 && body_ratio < 0.4 {
        patterns.push(CandlestickPattern::new(
            "shooting_star",
            PatternType::Bearish,
            upper_wick_ratio.min(1.0),
            "long upper wick rejection, sellers capped the high",
        ));
    }
}

/// Heuristic consolidation-zone score over the recent candles: impulse
/// magnitude, wick asymmetry of the impulse bar, and how deep later
/// closes retraced into its body.
fn order_block_probability(series: &[&Candle]) -> f64 {
    if series.len() < 3 {
        return 0.0;
    }
    let window = &series[series.len().saturating_sub(ORDER_BLOCK_LOOKBACK)..];

    // The impulse bar: largest body relative to its range.
    let mut impulse_idx = 0;
    let mut impulse = 0.0;
    for (i, candle) in window.iter().enumerate() {
        let range = candle.range();
        if range == 0.0 {
            continue;
        }
        let body_share = candle.body() / range;
        if body_share > impulse {
            impulse = body_share;
            impulse_idx = i;
        }
    }
    if impulse == 0.0 {
        return 0.0;
    }

    let impulse_candle = window[impulse_idx];
    let range = impulse_candle.range();
    let upper_wick = (impulse_candle.high - impulse_candle.open.max(impulse_candle.close)) / range;
    let lower_wick = (impulse_candle.open.min(impulse_candle.close) - impulse_candle.low) / range;
    let wick_asym = (upper_wick - lower_wick).abs();

    // Deepest retracement of subsequent closes into the impulse body.
    let body_top = impulse_candle.open.max(impulse_candle.close);
    let body_bottom = impulse_candle.open.min(impulse_candle.close);
    let body = body_top - body_bottom;
    let mut retrace: f64 = 0.0;
    if body > 0.0 {
        for candle in &window[impulse_idx + 1..] {
            let depth = if impulse_candle.is_bullish() {
                (body_top - candle.close) / body
            } else {
                (candle.close - body_bottom) / body
            };
            retrace = retrace.max(depth.clamp(0.0, 1.0));
        }
    }

    (0.45 * impulse + 0.25 * wick_asym + 0.30 * retrace).clamp(0.0, 1.0)
}

/// Three consecutive candles leaving a gap between bar i's high and bar
/// i+2's low (bullish) or bar i's low and bar i+2's high (bearish).
fn detect_fvg(series: &[&Candle]) -> bool {
    if series.len() < 3 {
        return false;
    }
    series.windows(3).any(|w| {
        let (first, third) = (w[0], w[2]);
        third.low > first.high || third.high < first.low
    })
}
