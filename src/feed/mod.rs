//! Market-data feed: wire protocol and connection client.

pub mod client;
pub mod protocol;

pub use client::{FeedClient, FeedCommand, FeedEvent};
pub use protocol::{FeedMessage, FeedRequest, RequestEnvelope, WireCandle};
