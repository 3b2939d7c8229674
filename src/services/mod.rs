pub mod aggregator;
pub mod prediction;
pub mod psychology;
pub mod session;
pub mod signals;

pub use aggregator::CandleAggregator;
pub use prediction::{predict, Prediction, VolatilityAssessment};
pub use session::SessionManager;
pub use signals::SignalEngine;
