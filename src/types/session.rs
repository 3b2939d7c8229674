use super::Timeframe;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Stopped,
}

/// Per-session overrides for signal generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    /// Whitelist of vote producers by name; absent means the default set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_indicators: Option<HashSet<String>>,
    /// Per-producer weight multipliers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_weights: Option<HashMap<String, f64>>,
    /// Override for the ATR volatility threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_threshold: Option<f64>,
}

/// A subscriber's live signal stream for one (symbol, timeframe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Downstream subscriber identity (one per chat).
    pub chat_id: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub status: SessionStatus,
    /// Epoch millis.
    pub started_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_signal_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<SessionOptions>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        symbol: impl Into<String>,
        timeframe: Timeframe,
        options: Option<SessionOptions>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            symbol: symbol.into(),
            timeframe,
            status: SessionStatus::Active,
            started_at: chrono::Utc::now().timestamp_millis(),
            last_signal_at: None,
            options,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}
