use std::env;

/// Signal generation configuration.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Minimum confidence (0-100) required to emit a CALL/PUT decision.
    pub min_confidence: u8,
    /// Seconds before candle close at which the signal fires.
    pub pre_close_seconds: i64,
    /// Delivery deadline hint for downstream subscribers.
    pub send_signal_seconds: i64,
    /// Closed candles fetched when priming a session.
    pub history_candles: usize,
    /// Candles exposed to chart-rendering subscribers.
    pub chart_candles: usize,
    /// Minimum closed candles required before any CALL/PUT decision.
    pub min_candles_for_signal: usize,
    /// Closed-candle ring capacity per (symbol, timeframe).
    pub window_capacity: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_confidence: 60,
            pre_close_seconds: 4,
            send_signal_seconds: 3,
            history_candles: 300,
            chart_candles: 100,
            min_candles_for_signal: 50,
            window_capacity: 500,
        }
    }
}

/// Volatility override configuration.
#[derive(Debug, Clone)]
pub struct VolatilityConfig {
    /// ATR14 / estimated close above this ratio abstains.
    pub atr_threshold: f64,
    /// Tick-scale (max-min)/mid above this ratio abstains.
    pub tick_volatility_threshold: f64,
    /// Number of recent forming-candle ticks measured.
    pub tick_volatility_window: usize,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            atr_threshold: 0.005,
            tick_volatility_threshold: 0.003,
            tick_volatility_window: 10,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Market-data feed WebSocket URL.
    pub feed_url: String,
    /// Provider application id appended to the feed URL.
    pub feed_app_id: Option<String>,
    /// History fetch timeout in seconds.
    pub history_timeout_secs: u64,
    /// Reconnect backoff start in seconds.
    pub reconnect_base_secs: u64,
    /// Reconnect backoff cap in seconds.
    pub reconnect_cap_secs: u64,
    /// Signal generation settings.
    pub signal: SignalConfig,
    /// Volatility override settings.
    pub volatility: VolatilityConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = SignalConfig::default();
        let vol_defaults = VolatilityConfig::default();

        Self {
            feed_url: env::var("FEED_URL")
                .unwrap_or_else(|_| "wss://ws.derivws.com/websockets/v3".to_string()),
            feed_app_id: env::var("FEED_APP_ID").ok(),
            history_timeout_secs: env::var("HISTORY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            reconnect_base_secs: env::var("RECONNECT_BASE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            reconnect_cap_secs: env::var("RECONNECT_CAP_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            signal: SignalConfig {
                min_confidence: env::var("MIN_CONFIDENCE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.min_confidence),
                pre_close_seconds: env::var("PRE_CLOSE_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.pre_close_seconds),
                send_signal_seconds: env::var("SEND_SIGNAL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.send_signal_seconds),
                history_candles: env::var("HISTORY_CANDLES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.history_candles),
                chart_candles: env::var("CHART_CANDLES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.chart_candles),
                min_candles_for_signal: env::var("MIN_CANDLES_FOR_SIGNAL")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.min_candles_for_signal),
                window_capacity: env::var("WINDOW_CAPACITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.window_capacity),
            },
            volatility: VolatilityConfig {
                atr_threshold: env::var("ATR_THRESHOLD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(vol_defaults.atr_threshold),
                tick_volatility_threshold: env::var("TICK_VOLATILITY_THRESHOLD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(vol_defaults.tick_volatility_threshold),
                tick_volatility_window: env::var("TICK_VOLATILITY_WINDOW")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(vol_defaults.tick_volatility_window),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "wss://ws.derivws.com/websockets/v3".to_string(),
            feed_app_id: None,
            history_timeout_secs: 10,
            reconnect_base_secs: 1,
            reconnect_cap_secs: 30,
            signal: SignalConfig::default(),
            volatility: VolatilityConfig::default(),
        }
    }
}
