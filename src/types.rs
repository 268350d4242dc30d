/// Core type definitions for the chart sync engine
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV Bar data structure
///
/// `time` is the upstream bar timestamp in unix seconds and is the series
/// key: within a stored series it is unique and strictly increasing. The
/// OHLC range relationship is taken as-is from upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Bar timestamp as a chrono datetime (for logging)
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.time, 0).unwrap_or_default()
    }
}

/// Bar granularity, mapped to the upstream history endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    OneDay,
    OneMinute,
}

impl Granularity {
    pub fn as_str(&self) -> &str {
        match self {
            Granularity::OneDay => "1d",
            Granularity::OneMinute => "1m",
        }
    }

    /// Upstream endpoint path segment for this granularity
    pub fn endpoint(&self) -> &str {
        match self {
            Granularity::OneDay => "histoday",
            Granularity::OneMinute => "histominute",
        }
    }
}
