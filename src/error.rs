use thiserror::Error;

/// Errors surfaced by the market-data feed client.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("provider rejected {symbol}: {message}")]
    Symbol { symbol: String, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection closed")]
    ConnectionClosed,
}

/// Errors surfaced by session lifecycle operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session already exists: {0}")]
    Conflict(String),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("unsupported timeframe: {0}s")]
    InvalidTimeframe(i64),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
pub type SessionResult<T> = std::result::Result<T, SessionError>;
