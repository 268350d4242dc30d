/// Market data REST client (CryptoCompare-style endpoints)
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::ChartConfig;
use crate::error::{ChartError, Result};
use crate::types::{Bar, Granularity};

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Data")]
    data: Option<Vec<HistoryRow>>,
}

/// One upstream OHLCV row. Fields are optional so a malformed row can be
/// dropped individually instead of failing the whole batch.
#[derive(Debug, Deserialize)]
struct HistoryRow {
    time: Option<i64>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volumefrom: Option<f64>,
}

impl HistoryRow {
    fn into_bar(self) -> Option<Bar> {
        Some(Bar {
            time: self.time?,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volumefrom?,
        })
    }
}

/// Seam for the history bootstrap fetch, so the engine can be driven by a
/// scripted fetcher in tests
pub trait HistoryFetch: Send + Sync {
    fn fetch_history(&self, symbol: &str) -> BoxFuture<'static, Result<Vec<Bar>>>;
}

/// Seam for the per-tick latest-bar fetch
pub trait LatestBarFetch: Send + Sync {
    fn fetch_latest(&self, symbol: &str) -> BoxFuture<'static, Result<Bar>>;
}

/// REST client for the history and live endpoints
///
/// Owns its own `reqwest::Client`, built with the configured request
/// timeout. One request per call; retry policy belongs to the caller.
#[derive(Clone)]
pub struct MarketDataClient {
    client: Client,
    base_url: String,
    quote_currency: String,
    history_limit: usize,
}

impl MarketDataClient {
    pub fn new(config: &ChartConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        MarketDataClient {
            client,
            base_url: config.api_base_url.clone(),
            quote_currency: config.quote_currency.clone(),
            history_limit: config.history_limit,
        }
    }

    /// Fetch the bounded daily history window for a symbol
    pub async fn get_daily_history(&self, symbol: &str) -> Result<Vec<Bar>> {
        let url = format!(
            "{}/{}?fsym={}&tsym={}&limit={}",
            self.base_url,
            Granularity::OneDay.endpoint(),
            symbol,
            self.quote_currency,
            self.history_limit
        );

        debug!("Fetching daily history: {}", url);

        let body = self.get_body(&url).await?;
        let bars = parse_history(&body)?;

        debug!("Fetched {} daily bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    /// Fetch the current partial minute bar for a symbol
    pub async fn get_latest_minute(&self, symbol: &str) -> Result<Bar> {
        let url = format!(
            "{}/{}?fsym={}&tsym={}&limit=1",
            self.base_url,
            Granularity::OneMinute.endpoint(),
            symbol,
            self.quote_currency
        );

        debug!("Fetching latest minute bar: {}", url);

        let body = self.get_body(&url).await?;
        let bar = parse_latest(&body)?;

        debug!(
            "Latest bar for {}: t={} close={}",
            symbol, bar.time, bar.close
        );
        Ok(bar)
    }

    async fn get_body(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let body = response.text().await.map_err(map_transport_error)?;
        Ok(body)
    }
}

fn map_transport_error(err: reqwest::Error) -> ChartError {
    if err.is_timeout() {
        ChartError::NetworkTimeout(format!("Request timed out: {}", err))
    } else {
        ChartError::HttpError(err)
    }
}

/// Parse a history response body into ascending bars, dropping malformed
/// rows individually
fn parse_history(body: &str) -> Result<Vec<Bar>> {
    let rows = parse_rows(body)?;
    Ok(rows.into_iter().filter_map(HistoryRow::into_bar).collect())
}

/// Parse a live response body into the current partial bar
///
/// The upstream convention for `histominute?limit=1` is to return the bar
/// before current at index 0 and the current partial bar at index 1. The
/// index choice is an external API quirk and is preserved exactly.
fn parse_latest(body: &str) -> Result<Bar> {
    let mut rows = parse_rows(body)?;
    if rows.len() < 2 {
        return Err(ChartError::DecodeError(format!(
            "Expected 2 rows in live response, got {}",
            rows.len()
        )));
    }

    rows.swap_remove(1)
        .into_bar()
        .ok_or_else(|| ChartError::DecodeError("Current bar row incomplete".to_string()))
}

fn parse_rows(body: &str) -> Result<Vec<HistoryRow>> {
    let response: HistoryResponse = serde_json::from_str(body)?;

    if response.response.as_deref() == Some("Error") {
        return Err(ChartError::DecodeError(format!(
            "Upstream error: {}",
            response.message.unwrap_or_else(|| "no message".to_string())
        )));
    }

    response
        .data
        .ok_or_else(|| ChartError::DecodeError("No data in response".to_string()))
}

impl HistoryFetch for MarketDataClient {
    fn fetch_history(&self, symbol: &str) -> BoxFuture<'static, Result<Vec<Bar>>> {
        let this = self.clone();
        let symbol = symbol.to_string();
        Box::pin(async move { this.get_daily_history(&symbol).await })
    }
}

impl LatestBarFetch for MarketDataClient {
    fn fetch_latest(&self, symbol: &str) -> BoxFuture<'static, Result<Bar>> {
        let this = self.clone();
        let symbol = symbol.to_string();
        Box::pin(async move { this.get_latest_minute(&symbol).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history_maps_rows() {
        let body = r#"{
            "Response": "Success",
            "Data": [
                {"time": 100, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volumefrom": 10.0},
                {"time": 200, "open": 1.5, "high": 2.5, "low": 1.0, "close": 2.0, "volumefrom": 20.0}
            ]
        }"#;

        let bars = parse_history(body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 100);
        assert_eq!(bars[1].volume, 20.0);
    }

    #[test]
    fn test_parse_history_drops_malformed_rows_individually() {
        let body = r#"{
            "Data": [
                {"time": 100, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volumefrom": 10.0},
                {"time": 200, "open": 1.5},
                {"time": 300, "open": 2.0, "high": 3.0, "low": 1.5, "close": 2.5, "volumefrom": 30.0}
            ]
        }"#;

        let bars = parse_history(body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 100);
        assert_eq!(bars[1].time, 300);
    }

    #[test]
    fn test_parse_history_surfaces_upstream_error_envelope() {
        let body = r#"{"Response": "Error", "Message": "fsym param is invalid"}"#;
        let err = parse_history(body).unwrap_err();
        assert!(matches!(err, ChartError::DecodeError(_)));
        assert!(err.to_string().contains("fsym param is invalid"));
    }

    #[test]
    fn test_parse_history_missing_data_is_decode_error() {
        let body = r#"{"Response": "Success"}"#;
        assert!(matches!(
            parse_history(body),
            Err(ChartError::DecodeError(_))
        ));
    }

    #[test]
    fn test_parse_latest_reads_index_one() {
        // Index 0 is the completed previous bar, index 1 the current
        // partial bar.
        let body = r#"{
            "Data": [
                {"time": 100, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volumefrom": 10.0},
                {"time": 160, "open": 1.5, "high": 2.5, "low": 1.0, "close": 2.0, "volumefrom": 20.0}
            ]
        }"#;

        let bar = parse_latest(body).unwrap();
        assert_eq!(bar.time, 160);
        assert_eq!(bar.close, 2.0);
    }

    #[test]
    fn test_parse_latest_with_single_row_is_decode_error() {
        let body = r#"{
            "Data": [
                {"time": 100, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volumefrom": 10.0}
            ]
        }"#;

        assert!(matches!(parse_latest(body), Err(ChartError::DecodeError(_))));
    }

    #[test]
    fn test_parse_latest_incomplete_current_row_is_decode_error() {
        let body = r#"{
            "Data": [
                {"time": 100, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volumefrom": 10.0},
                {"time": 160}
            ]
        }"#;

        assert!(matches!(parse_latest(body), Err(ChartError::DecodeError(_))));
    }
}
