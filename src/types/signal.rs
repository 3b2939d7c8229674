use super::{Candle, IndicatorValues, PsychologyAnalysis};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final directional decision for a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    Call,
    Put,
    NoTrade,
}

impl SignalDirection {
    /// Display label used in downstream messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
            Self::NoTrade => "NO TRADE",
        }
    }
}

/// Direction of a single indicator vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteDirection {
    Up,
    Down,
    Neutral,
}

/// A weighted directional opinion from one vote producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Producer name, e.g. "ema_cross_5_21".
    pub indicator: String,
    pub direction: VoteDirection,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Vote {
    pub fn up(indicator: impl Into<String>, weight: f64, reason: impl Into<String>) -> Self {
        Self {
            indicator: indicator.into(),
            direction: VoteDirection::Up,
            weight,
            reason: Some(reason.into()),
        }
    }

    pub fn down(indicator: impl Into<String>, weight: f64, reason: impl Into<String>) -> Self {
        Self {
            indicator: indicator.into(),
            direction: VoteDirection::Down,
            weight,
            reason: Some(reason.into()),
        }
    }

    pub fn neutral(indicator: impl Into<String>, weight: f64) -> Self {
        Self {
            indicator: indicator.into(),
            direction: VoteDirection::Neutral,
            weight,
            reason: None,
        }
    }
}

/// The complete output of one signal evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalResult {
    /// Unique id for downstream persistence.
    pub id: String,
    pub session_id: String,
    pub symbol: String,
    pub timeframe_secs: i64,
    /// Wall-clock time the signal was computed (epoch millis).
    pub timestamp: i64,
    /// Epoch second at which the evaluated candle closes.
    pub candle_close_time: i64,
    pub direction: SignalDirection,
    /// 0-100.
    pub confidence: u8,
    pub p_up: f64,
    pub p_down: f64,
    pub votes: Vec<Vote>,
    pub indicators: IndicatorValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psychology: Option<PsychologyAnalysis>,
    pub volatility_override: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_reason: Option<String>,
    pub closed_candles_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forming_candle: Option<Candle>,
}

impl SignalResult {
    /// A well-formed abstention with no votes, used for degenerate inputs.
    pub fn no_trade(
        session_id: impl Into<String>,
        symbol: impl Into<String>,
        timeframe_secs: i64,
        candle_close_time: i64,
        closed_candles_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            symbol: symbol.into(),
            timeframe_secs,
            timestamp: chrono::Utc::now().timestamp_millis(),
            candle_close_time,
            direction: SignalDirection::NoTrade,
            confidence: 0,
            p_up: 0.5,
            p_down: 0.5,
            votes: Vec::new(),
            indicators: IndicatorValues::default(),
            psychology: None,
            volatility_override: false,
            volatility_reason: None,
            closed_candles_count,
            forming_candle: None,
        }
    }
}
