//! Forming-candle prediction: combines closed candles with the forming
//! candle, routes the series through the indicator and psychology engines,
//! and assesses short-horizon volatility.

use super::psychology;
use super::signals::indicators;
use crate::config::VolatilityConfig;
use crate::types::{Candle, IndicatorValues, PsychologyAnalysis};

/// Short-horizon volatility assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityAssessment {
    pub is_volatile: bool,
    /// Names the rule that fired.
    pub reason: Option<String>,
}

/// Combined engine inputs for one evaluation.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// The forming candle's current close, or the last closed close.
    pub estimated_close: f64,
    pub indicators: IndicatorValues,
    pub psychology: PsychologyAnalysis,
    pub volatility: VolatilityAssessment,
}

/// Evaluate the series. `recent_ticks` carries the forming candle's most
/// recent tick prices for the tick-scale volatility rule.
pub fn predict(
    closed: &[Candle],
    forming: Option<&Candle>,
    recent_ticks: &[f64],
    config: &VolatilityConfig,
    atr_threshold_override: Option<f64>,
) -> Option<Prediction> {
    let estimated_close = forming
        .map(|c| c.close)
        .or_else(|| closed.last().map(|c| c.close))?;

    let indicators = indicators::compute(closed, forming);
    let psychology = psychology::analyze(closed, forming);
    let volatility = assess_volatility(
        &indicators,
        estimated_close,
        recent_ticks,
        config,
        atr_threshold_override,
    );

    Some(Prediction {
        estimated_close,
        indicators,
        psychology,
        volatility,
    })
}

fn assess_volatility(
    indicators: &IndicatorValues,
    estimated_close: f64,
    recent_ticks: &[f64],
    config: &VolatilityConfig,
    atr_threshold_override: Option<f64>,
) -> VolatilityAssessment {
    let atr_threshold = atr_threshold_override.unwrap_or(config.atr_threshold);

    if let Some(atr) = indicators.atr_14 {
        if estimated_close > 0.0 {
            let ratio = atr / estimated_close;
            if ratio > atr_threshold {
                return VolatilityAssessment {
                    is_volatile: true,
                    reason: Some(format!(
                        "ATR ratio {:.5} above threshold {:.5}",
                        ratio, atr_threshold
                    )),
                };
            }
        }
    }

    if recent_ticks.len() >= config.tick_volatility_window {
        let window = &recent_ticks[recent_ticks.len() - config.tick_volatility_window..];
        let max = window.iter().copied().fold(f64::MIN, f64::max);
        let min = window.iter().copied().fold(f64::MAX, f64::min);
        let mid = (max + min) / 2.0;
        if mid > 0.0 {
            let spread = (max - min) / mid;
            if spread > config.tick_volatility_threshold {
                return VolatilityAssessment {
                    is_volatile: true,
                    reason: Some(format!(
                        "tick spread {:.5} above threshold {:.5} over last {} ticks",
                        spread, config.tick_volatility_threshold, config.tick_volatility_window
                    )),
                };
            }
        }
    }

    VolatilityAssessment {
        is_volatile: false,
        reason: None,
    }
}
