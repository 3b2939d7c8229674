//! Default vote-producer weight table.

/// Built-in weights by producer name. Every listed producer is enabled by
/// default; a session whitelist narrows the set.
pub const DEFAULT_INDICATOR_WEIGHTS: &[(&str, f64)] = &[
    ("ema_cross_5_21", 1.2),
    ("ema_cross_9_21", 1.1),
    ("ema_cross_12_50", 1.3),
    ("sma_trend_20", 0.8),
    ("sma_trend_50", 0.9),
    ("sma_trend_200", 1.0),
    ("macd_signal", 1.4),
    ("macd_histogram", 1.2),
    ("rsi_oversold", 1.3),
    ("rsi_overbought", 1.3),
    ("rsi_trend", 1.0),
    ("stochastic_cross", 1.1),
    ("stochastic_extreme", 1.2),
    ("bollinger_squeeze", 0.9),
    ("bollinger_breakout", 1.4),
    ("supertrend_signal", 1.5),
    ("psar_signal", 1.2),
    ("adx_strength", 0.7),
    ("cci_signal", 1.0),
    ("williams_r", 1.0),
    ("hull_ma", 1.1),
    ("mean_reversion", 1.2),
    ("engulfing_pattern", 1.5),
    ("hammer_pattern", 1.3),
    ("shooting_star", 1.3),
    ("doji_pattern", 0.8),
    ("order_block", 1.4),
    ("fvg_signal", 1.2),
    ("wick_rejection", 1.1),
];

/// Default weight for a producer; unknown names are excluded entirely.
pub fn default_weight(name: &str) -> Option<f64> {
    DEFAULT_INDICATOR_WEIGHTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, w)| *w)
}
