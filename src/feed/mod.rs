pub mod client;
pub mod poller;

pub use client::{HistoryFetch, LatestBarFetch, MarketDataClient};
pub use poller::{BarCallback, LivePoller, PollErrorCallback};
