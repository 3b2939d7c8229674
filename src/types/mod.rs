pub mod candle;
pub mod indicators;
pub mod psychology;
pub mod session;
pub mod signal;

pub use candle::{Candle, Tick, Timeframe};
pub use indicators::{
    BandOutput, ChannelOutput, IndicatorValues, MacdOutput, StochasticOutput, SuperTrendOutput,
    TrendDirection,
};
pub use psychology::{CandlestickPattern, MarketBias, PatternType, PsychologyAnalysis};
pub use session::{Session, SessionOptions, SessionStatus};
pub use signal::{SignalDirection, SignalResult, Vote, VoteDirection};
