use serde::{Deserialize, Serialize};

/// Directional tint of a candlestick pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Bullish,
    Bearish,
    Neutral,
}

/// A detected candlestick pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlestickPattern {
    /// Stable identifier, e.g. "bullish_engulfing".
    pub name: String,
    pub pattern_type: PatternType,
    /// Signal strength in (0, 1].
    pub strength: f64,
    pub description: String,
}

impl CandlestickPattern {
    pub fn new(
        name: impl Into<String>,
        pattern_type: PatternType,
        strength: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern_type,
            strength: strength.clamp(0.0, 1.0),
            description: description.into(),
        }
    }
}

/// Overall bias read from the most recent candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketBias {
    Bullish,
    Bearish,
    Neutral,
}

/// Candle anatomy and pattern read of the most recent price action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychologyAnalysis {
    /// |close - open| / (high - low); 0 when the range is 0.
    pub body_ratio: f64,
    /// (high - max(open, close)) / (high - low).
    pub upper_wick_ratio: f64,
    /// (min(open, close) - low) / (high - low).
    pub lower_wick_ratio: f64,
    /// Body under 10% of the range.
    pub is_doji: bool,
    pub patterns: Vec<CandlestickPattern>,
    pub bias: MarketBias,
    /// Heuristic consolidation-zone score in [0, 1].
    pub order_block_probability: f64,
    /// Three-bar fair value gap present.
    pub fvg_detected: bool,
}

impl Default for PsychologyAnalysis {
    fn default() -> Self {
        Self {
            body_ratio: 0.0,
            upper_wick_ratio: 0.0,
            lower_wick_ratio: 0.0,
            is_doji: false,
            patterns: Vec::new(),
            bias: MarketBias::Neutral,
            order_block_probability: 0.0,
            fvg_detected: false,
        }
    }
}
