//! Weighted signal generation.
//!
//! Converts indicator and psychology outputs into directional votes,
//! scores them, and emits the final CALL/PUT/NO_TRADE decision.

pub mod indicators;
pub mod weights;

use super::prediction::{self, Prediction};
use crate::config::{SignalConfig, VolatilityConfig};
use crate::types::{
    Candle, IndicatorValues, MarketBias, PatternType, PsychologyAnalysis, SessionOptions,
    SignalDirection, SignalResult, Timeframe, TrendDirection, Vote, VoteDirection,
};
use tracing::debug;

/// Dead zone for the MACD histogram vote.
const HISTOGRAM_DEAD_ZONE: f64 = 1e-5;
/// Relative distance from an SMA that counts as a trend.
const SMA_TREND_BAND: f64 = 0.001;
/// Bollinger bandwidth below this reads as a squeeze.
const SQUEEZE_BANDWIDTH: f64 = 0.02;
/// Wick share of range that counts as a rejection.
const WICK_REJECTION_RATIO: f64 = 0.6;
/// Order-block probability that produces a vote.
const ORDER_BLOCK_TRIGGER: f64 = 0.6;

/// Stateless signal generator configured at startup.
pub struct SignalEngine {
    signal: SignalConfig,
    volatility: VolatilityConfig,
}

impl SignalEngine {
    pub fn new(signal: SignalConfig, volatility: VolatilityConfig) -> Self {
        Self { signal, volatility }
    }

    /// Evaluate one candle series into a decision.
    ///
    /// Never fails: degenerate inputs produce a well-formed NO_TRADE.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_signal(
        &self,
        session_id: &str,
        symbol: &str,
        timeframe: Timeframe,
        closed: &[Candle],
        forming: Option<&Candle>,
        recent_ticks: &[f64],
        candle_close_time: i64,
        options: Option<&SessionOptions>,
    ) -> SignalResult {
        let mut result = SignalResult::no_trade(
            session_id,
            symbol,
            timeframe.secs(),
            candle_close_time,
            closed.len(),
        );
        result.forming_candle = forming.cloned();

        if closed.len() < self.signal.min_candles_for_signal {
            debug!(
                symbol,
                closed = closed.len(),
                needed = self.signal.min_candles_for_signal,
                "insufficient history, abstaining"
            );
            return result;
        }

        let atr_override = options.and_then(|o| o.volatility_threshold);
        let Some(prediction) =
            prediction::predict(closed, forming, recent_ticks, &self.volatility, atr_override)
        else {
            return result;
        };

        if prediction.volatility.is_volatile {
            result.indicators = prediction.indicators;
            result.psychology = Some(prediction.psychology);
            result.volatility_override = true;
            result.volatility_reason = prediction.volatility.reason;
            return result;
        }

        let votes = weigh_votes(collect_votes(&prediction), options);
        let (final_up, final_down) = tally(&votes);

        let p_up = final_up / (final_up + final_down + 1e-9);
        let p_down = 1.0 - p_up;
        let confidence = (p_up.max(p_down) * 100.0).round() as u8;

        let direction = if confidence < self.signal.min_confidence {
            SignalDirection::NoTrade
        } else if p_up > 0.5 {
            SignalDirection::Call
        } else {
            SignalDirection::Put
        };

        result.direction = direction;
        result.confidence = if direction == SignalDirection::NoTrade {
            0
        } else {
            confidence
        };
        result.p_up = p_up;
        result.p_down = p_down;
        result.votes = votes;
        result.indicators = prediction.indicators;
        result.psychology = Some(prediction.psychology);
        result
    }
}

fn tally(votes: &[Vote]) -> (f64, f64) {
    let mut up = 0.0;
    let mut down = 0.0;
    for vote in votes {
        match vote.direction {
            VoteDirection::Up => up += vote.weight,
            VoteDirection::Down => down += vote.weight,
            VoteDirection::Neutral => {}
        }
    }
    (up, down)
}

/// Apply the enabled-set filter and weight multipliers.
fn weigh_votes(raw: Vec<Vote>, options: Option<&SessionOptions>) -> Vec<Vote> {
    let enabled = options.and_then(|o| o.enabled_indicators.as_ref());
    let custom = options.and_then(|o| o.custom_weights.as_ref());

    raw.into_iter()
        .filter_map(|mut vote| {
            if let Some(set) = enabled {
                if !set.contains(&vote.indicator) {
                    return None;
                }
            }
            let base = weights::default_weight(&vote.indicator)?;
            let multiplier = custom
                .and_then(|m| m.get(&vote.indicator))
                .copied()
                .unwrap_or(base);
            vote.weight *= multiplier;
            Some(vote)
        })
        .collect()
}

/// Run the full producer catalogue.
fn collect_votes(prediction: &Prediction) -> Vec<Vote> {
    let mut votes = Vec::new();
    let close = prediction.estimated_close;
    let ind = &prediction.indicators;

    ema_cross_votes(ind, close, &mut votes);
    sma_trend_votes(ind, close, &mut votes);
    macd_votes(ind, &mut votes);
    rsi_votes(ind, &mut votes);
    stochastic_votes(ind, &mut votes);
    bollinger_votes(ind, close, &mut votes);
    trend_follower_votes(ind, close, &mut votes);
    oscillator_votes(ind, close, &mut votes);
    psychology_votes(&prediction.psychology, &mut votes);

    votes
}

fn ema_cross_votes(ind: &IndicatorValues, close: f64, votes: &mut Vec<Vote>) {
    let pairs = [
        ("ema_cross_5_21", ind.ema_5, ind.ema_21),
        ("ema_cross_9_21", ind.ema_9, ind.ema_21),
        ("ema_cross_12_50", ind.ema_12, ind.ema_50),
    ];
    for (name, fast, slow) in pairs {
        let (Some(fast), Some(slow)) = (fast, slow) else {
            continue;
        };
        if fast > slow && close > fast {
            votes.push(Vote::up(name, 1.0, "fast EMA above slow, price above fast"));
        } else if fast < slow && close < fast {
            votes.push(Vote::down(name, 1.0, "fast EMA below slow, price below fast"));
        } else {
            votes.push(Vote::neutral(name, 0.3));
        }
    }
}

fn sma_trend_votes(ind: &IndicatorValues, close: f64, votes: &mut Vec<Vote>) {
    let smas = [
        ("sma_trend_20", ind.sma_20),
        ("sma_trend_50", ind.sma_50),
        ("sma_trend_200", ind.sma_200),
    ];
    for (name, sma) in smas {
        let Some(sma) = sma else { continue };
        if sma == 0.0 {
            continue;
        }
        let distance = (close - sma) / sma;
        if distance > SMA_TREND_BAND {
            votes.push(Vote::up(name, 1.0, "price trending above moving average"));
        } else if distance < -SMA_TREND_BAND {
            votes.push(Vote::down(name, 1.0, "price trending below moving average"));
        } else {
            votes.push(Vote::neutral(name, 0.5));
        }
    }
}

fn macd_votes(ind: &IndicatorValues, votes: &mut Vec<Vote>) {
    let Some(macd) = ind.macd else { return };

    if macd.macd > macd.signal {
        votes.push(Vote::up("macd_signal", 1.0, "MACD above signal line"));
    } else {
        votes.push(Vote::down("macd_signal", 1.0, "MACD below signal line"));
    }

    if macd.histogram > HISTOGRAM_DEAD_ZONE {
        votes.push(Vote::up("macd_histogram", 1.0, "histogram expanding bullish"));
    } else if macd.histogram < -HISTOGRAM_DEAD_ZONE {
        votes.push(Vote::down("macd_histogram", 1.0, "histogram expanding bearish"));
    } else {
        votes.push(Vote::neutral("macd_histogram", 0.3));
    }
}

fn rsi_votes(ind: &IndicatorValues, votes: &mut Vec<Vote>) {
    let Some(rsi) = ind.rsi_14 else { return };

    if rsi < 30.0 {
        votes.push(Vote::up("rsi_oversold", 1.0, format!("RSI {rsi:.1} oversold")));
    } else if rsi > 70.0 {
        votes.push(Vote::down("rsi_overbought", 1.0, format!("RSI {rsi:.1} overbought")));
    } else if rsi > 50.0 {
        votes.push(Vote::up("rsi_trend", 0.5, "RSI above midline"));
    } else {
        votes.push(Vote::down("rsi_trend", 0.5, "RSI below midline"));
    }
}

fn stochastic_votes(ind: &IndicatorValues, votes: &mut Vec<Vote>) {
    let Some(stoch) = ind.stochastic else { return };

    if stoch.k > stoch.d {
        votes.push(Vote::up("stochastic_cross", 1.0, "%K above %D"));
    } else if stoch.k < stoch.d {
        votes.push(Vote::down("stochastic_cross", 1.0, "%K below %D"));
    }

    if stoch.k < 20.0 {
        votes.push(Vote::up("stochastic_extreme", 1.0, "stochastic oversold"));
    } else if stoch.k > 80.0 {
        votes.push(Vote::down("stochastic_extreme", 1.0, "stochastic overbought"));
    }
}

fn bollinger_votes(ind: &IndicatorValues, close: f64, votes: &mut Vec<Vote>) {
    let Some(bands) = ind.bollinger else { return };

    if indicators::bollinger::bandwidth(&bands) < SQUEEZE_BANDWIDTH {
        votes.push(Vote::neutral("bollinger_squeeze", 1.0));
    }

    if close > bands.upper {
        votes.push(Vote::up("bollinger_breakout", 1.0, "close above upper band"));
    } else if close < bands.lower {
        votes.push(Vote::down("bollinger_breakout", 1.0, "close below lower band"));
    }
}

fn trend_follower_votes(ind: &IndicatorValues, close: f64, votes: &mut Vec<Vote>) {
    if let Some(st) = ind.supertrend {
        match st.direction {
            TrendDirection::Up => {
                votes.push(Vote::up("supertrend_signal", 1.0, "SuperTrend flipped up"))
            }
            TrendDirection::Down => {
                votes.push(Vote::down("supertrend_signal", 1.0, "SuperTrend flipped down"))
            }
        }
    }

    if let Some(psar) = ind.psar {
        if close > psar {
            votes.push(Vote::up("psar_signal", 1.0, "price above parabolic SAR"));
        } else {
            votes.push(Vote::down("psar_signal", 1.0, "price below parabolic SAR"));
        }
    }

    if let Some(adx) = ind.adx_14 {
        if adx < 25.0 {
            votes.push(Vote::neutral("adx_strength", 1.0));
        }
    }

    if let Some(hull) = ind.hull_9 {
        if close > hull {
            votes.push(Vote::up("hull_ma", 1.0, "price above Hull MA"));
        } else if close < hull {
            votes.push(Vote::down("hull_ma", 1.0, "price below Hull MA"));
        }
    }
}

fn oscillator_votes(ind: &IndicatorValues, _close: f64, votes: &mut Vec<Vote>) {
    if let Some(cci) = ind.cci_20 {
        if cci > 100.0 {
            votes.push(Vote::down("cci_signal", 1.0, "CCI stretched above +100"));
        } else if cci < -100.0 {
            votes.push(Vote::up("cci_signal", 1.0, "CCI stretched below -100"));
        }
    }

    if let Some(wr) = ind.williams_r {
        if wr < -80.0 {
            votes.push(Vote::up("williams_r", 1.0, "Williams %R oversold"));
        } else if wr > -20.0 {
            votes.push(Vote::down("williams_r", 1.0, "Williams %R overbought"));
        }
    }

    if let Some(z) = ind.zscore_20 {
        if z > 2.0 {
            votes.push(Vote::down("mean_reversion", 1.0, "close stretched above the mean"));
        } else if z < -2.0 {
            votes.push(Vote::up("mean_reversion", 1.0, "close stretched below the mean"));
        }
    }
}

fn psychology_votes(psych: &PsychologyAnalysis, votes: &mut Vec<Vote>) {
    for pattern in &psych.patterns {
        let name = match pattern.name.as_str() {
            "bullish_engulfing" | "bearish_engulfing" => "engulfing_pattern",
            "hammer" => "hammer_pattern",
            "shooting_star" => "shooting_star",
            "doji" => "doji_pattern",
            other => other,
        };
        let vote = match pattern.pattern_type {
            PatternType::Bullish => Vote::up(name, pattern.strength, pattern.description.clone()),
            PatternType::Bearish => Vote::down(name, pattern.strength, pattern.description.clone()),
            PatternType::Neutral => Vote::neutral(name, pattern.strength),
        };
        votes.push(vote);
    }

    if psych.order_block_probability > ORDER_BLOCK_TRIGGER {
        let vote = match psych.bias {
            MarketBias::Bullish => Vote::up(
                "order_block",
                psych.order_block_probability,
                "order block with bullish bias",
            ),
            MarketBias::Bearish => Vote::down(
                "order_block",
                psych.order_block_probability,
                "order block with bearish bias",
            ),
            MarketBias::Neutral => Vote::neutral("order_block", psych.order_block_probability),
        };
        votes.push(vote);
    }

    if psych.fvg_detected {
        let vote = match psych.bias {
            MarketBias::Bullish => Vote::up("fvg_signal", 1.0, "fair value gap, bullish bias"),
            MarketBias::Bearish => Vote::down("fvg_signal", 1.0, "fair value gap, bearish bias"),
            MarketBias::Neutral => Vote::neutral("fvg_signal", 1.0),
        };
        votes.push(vote);
    }

    if psych.upper_wick_ratio > WICK_REJECTION_RATIO {
        votes.push(Vote::down("wick_rejection", 1.0, "upper wick rejection"));
    } else if psych.lower_wick_ratio > WICK_REJECTION_RATIO {
        votes.push(Vote::up("wick_rejection", 1.0, "lower wick rejection"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn engine() -> SignalEngine {
        SignalEngine::new(SignalConfig::default(), VolatilityConfig::default())
    }

    fn trending_candles(count: usize, step: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 1000.0 + i as f64 * step;
                let open = base;
                let close = base + step * 0.5;
                Candle {
                    symbol: "R_100".to_string(),
                    timeframe_secs: 60,
                    open,
                    high: open.max(close) + 0.2,
                    low: open.min(close) - 0.2,
                    close,
                    start_epoch: i as i64 * 60,
                    tick_count: 10,
                    is_forming: false,
                }
            })
            .collect()
    }

    #[test]
    fn test_insufficient_data_abstains() {
        let candles = trending_candles(10, 0.5);
        let result = engine().generate_signal(
            "s1", "R_100", Timeframe::M1, &candles, None, &[], 660, None,
        );
        assert_eq!(result.direction, SignalDirection::NoTrade);
        assert_eq!(result.confidence, 0);
        assert!(result.votes.is_empty());
        assert!(result.indicators.is_empty());
        assert!(!result.volatility_override);
    }

    #[test]
    fn test_uptrend_produces_call() {
        let candles = trending_candles(100, 0.5);
        let result = engine().generate_signal(
            "s1",
            "R_100",
            Timeframe::M1,
            &candles,
            None,
            &[],
            100 * 60,
            None,
        );
        assert_eq!(result.direction, SignalDirection::Call);
        assert!(result.confidence >= 60);
        assert!(result.p_up > 0.5);

        let up_names: Vec<&str> = result
            .votes
            .iter()
            .filter(|v| v.direction == VoteDirection::Up)
            .map(|v| v.indicator.as_str())
            .collect();
        assert!(up_names.contains(&"ema_cross_5_21"));
        assert!(up_names.contains(&"macd_signal"));
        assert!(up_names.iter().any(|n| n.starts_with("sma_trend")));
    }

    #[test]
    fn test_downtrend_produces_put() {
        let candles = trending_candles(100, -0.5);
        let result = engine().generate_signal(
            "s1",
            "R_100",
            Timeframe::M1,
            &candles,
            None,
            &[],
            100 * 60,
            None,
        );
        assert_eq!(result.direction, SignalDirection::Put);
        assert!(result.confidence >= 60);
        assert!(result.p_up < 0.5);
    }

    #[test]
    fn test_probability_closure() {
        let candles = trending_candles(100, 0.5);
        let result = engine().generate_signal(
            "s1",
            "R_100",
            Timeframe::M1,
            &candles,
            None,
            &[],
            100 * 60,
            None,
        );
        assert!((result.p_up + result.p_down - 1.0).abs() < 1e-9);
        assert_eq!(
            result.confidence,
            (result.p_up.max(result.p_down) * 100.0).round() as u8
        );
    }

    #[test]
    fn test_volatile_market_overrides() {
        let candles: Vec<Candle> = (0..100)
            .map(|i| Candle {
                symbol: "R_100".to_string(),
                timeframe_secs: 60,
                open: 100.0,
                high: 104.0,
                low: 96.0,
                close: if i % 2 == 0 { 103.0 } else { 97.0 },
                start_epoch: i as i64 * 60,
                tick_count: 10,
                is_forming: false,
            })
            .collect();
        let result = engine().generate_signal(
            "s1",
            "R_100",
            Timeframe::M1,
            &candles,
            None,
            &[],
            100 * 60,
            None,
        );
        assert_eq!(result.direction, SignalDirection::NoTrade);
        assert_eq!(result.confidence, 0);
        assert!(result.volatility_override);
        assert!(result.volatility_reason.is_some());
        // Indicators still populated for diagnostics.
        assert!(!result.indicators.is_empty());
    }

    #[test]
    fn test_enabled_indicators_whitelist() {
        let candles = trending_candles(100, 0.5);
        let options = SessionOptions {
            enabled_indicators: Some(HashSet::from(["macd_signal".to_string()])),
            custom_weights: None,
            volatility_threshold: None,
        };
        let result = engine().generate_signal(
            "s1",
            "R_100",
            Timeframe::M1,
            &candles,
            None,
            &[],
            100 * 60,
            Some(&options),
        );
        assert!(result.votes.iter().all(|v| v.indicator == "macd_signal"));
        assert!(!result.votes.is_empty());
    }

    #[test]
    fn test_custom_weights_scale_votes() {
        let candles = trending_candles(100, 0.5);
        let options = SessionOptions {
            enabled_indicators: None,
            custom_weights: Some(HashMap::from([("macd_signal".to_string(), 3.0)])),
            volatility_threshold: None,
        };
        let result = engine().generate_signal(
            "s1",
            "R_100",
            Timeframe::M1,
            &candles,
            None,
            &[],
            100 * 60,
            Some(&options),
        );
        let macd_vote = result
            .votes
            .iter()
            .find(|v| v.indicator == "macd_signal")
            .unwrap();
        assert!((macd_vote.weight - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_idempotence() {
        let candles = trending_candles(100, 0.5);
        let a = engine().generate_signal(
            "s1", "R_100", Timeframe::M1, &candles, None, &[], 6000, None,
        );
        let b = engine().generate_signal(
            "s1", "R_100", Timeframe::M1, &candles, None, &[], 6000, None,
        );
        assert_eq!(a.direction, b.direction);
        assert_eq!(a.p_up, b.p_up);
        assert_eq!(a.votes, b.votes);
    }

    #[test]
    fn test_decision_respects_confidence_gate() {
        let candles = trending_candles(100, 0.5);
        let strict = SignalEngine::new(
            SignalConfig {
                min_confidence: 101,
                ..SignalConfig::default()
            },
            VolatilityConfig::default(),
        );
        let result = strict.generate_signal(
            "s1",
            "R_100",
            Timeframe::M1,
            &candles,
            None,
            &[],
            100 * 60,
            None,
        );
        assert_eq!(result.direction, SignalDirection::NoTrade);
        assert_eq!(result.confidence, 0);
    }
}
