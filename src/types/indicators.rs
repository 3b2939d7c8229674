use serde::{Deserialize, Serialize};

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Stochastic oscillator %K and %D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticOutput {
    pub k: f64,
    pub d: f64,
}

/// Upper/middle/lower band triple (Bollinger, Keltner).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Upper/lower channel pair (Donchian, ATR bands).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelOutput {
    pub upper: f64,
    pub lower: f64,
}

/// Trend direction reported by directional indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// SuperTrend line value and its direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuperTrendOutput {
    pub value: f64,
    pub direction: TrendDirection,
}

/// Fixed record of indicator values for one candle series.
///
/// Every field is optional: an indicator is omitted (not zeroed) when the
/// series is too short for its lookback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_9: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_12: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_21: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_200: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<MacdOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi_14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stochastic: Option<StochasticOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr_14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adx_14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cci_20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub williams_r: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger: Option<BandOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keltner: Option<BandOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hull_9: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supertrend: Option<SuperTrendOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roc_12: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momentum_10: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chaikin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fisher_10: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donchian: Option<ChannelOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zscore_20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linreg_slope_14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr_bands: Option<ChannelOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_percentile: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_ribbon: Option<f64>,
}

impl IndicatorValues {
    /// True when no indicator produced a value.
    pub fn is_empty(&self) -> bool {
        self == &IndicatorValues::default()
    }
}
