/// Configuration loading from TOML file
use serde::Deserialize;
use std::path::Path;

use crate::error::{ChartError, Result};

/// Runtime configuration for the chart sync engine
#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    /// Base URL of the market data API
    pub api_base_url: String,

    /// Quote currency for all price requests (tsym)
    pub quote_currency: String,

    /// Number of daily bars to bootstrap on asset selection
    pub history_limit: usize,

    /// Seconds between live poll ticks
    pub poll_interval_secs: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Logging
    pub log_level: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            api_base_url: "https://min-api.cryptocompare.com/data".to_string(),
            quote_currency: "USD".to_string(),
            history_limit: 300,
            poll_interval_secs: 60,
            request_timeout_secs: 10,
            log_level: "info".to_string(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ChartConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ChartError::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: ChartConfig = toml::from_str(&content)
        .map_err(|e| ChartError::ConfigError(format!("Failed to parse config: {}", e)))?;

    // Validate config
    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &ChartConfig) -> Result<()> {
    if config.api_base_url.is_empty() {
        return Err(ChartError::ConfigError("api_base_url is empty".to_string()));
    }

    if config.quote_currency.is_empty() {
        return Err(ChartError::ConfigError("quote_currency is empty".to_string()));
    }

    if config.history_limit == 0 {
        return Err(ChartError::ConfigError(
            "history_limit must be at least 1".to_string(),
        ));
    }

    if config.poll_interval_secs == 0 {
        return Err(ChartError::ConfigError(
            "poll_interval_secs must be at least 1".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ChartError::ConfigError(
            "request_timeout_secs must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = ChartConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_reject_zero_history_limit() {
        let config = ChartConfig {
            history_limit: 0,
            ..ChartConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_reject_empty_quote_currency() {
        let config = ChartConfig {
            quote_currency: String::new(),
            ..ChartConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_parse_config_from_toml() {
        let toml_str = r#"
            api_base_url = "https://min-api.cryptocompare.com/data"
            quote_currency = "BRL"
            history_limit = 300
            poll_interval_secs = 60
            request_timeout_secs = 10
            log_level = "debug"
        "#;
        let config: ChartConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.quote_currency, "BRL");
        assert_eq!(config.history_limit, 300);
        assert!(validate_config(&config).is_ok());
    }
}
