/// Centralized error types for the chart sync engine
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    // Network Errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Network timeout: {0}")]
    NetworkTimeout(String),

    // Data Errors
    #[error("Response shape unexpected: {0}")]
    DecodeError(String),

    #[error("Deserialization failed: {0}")]
    DeserializationError(#[from] serde_json::Error),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic Errors
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, ChartError>;

impl ChartError {
    /// Check if error is recoverable (caller may retry by re-selecting the asset)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChartError::HttpError(_)
                | ChartError::NetworkTimeout(_)
                | ChartError::DecodeError(_)
                | ChartError::DeserializationError(_)
        )
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            ChartError::HttpError(_) => "NET_001",
            ChartError::NetworkTimeout(_) => "NET_002",
            ChartError::DecodeError(_) => "DATA_001",
            ChartError::DeserializationError(_) => "DATA_002",
            ChartError::ConfigError(_) => "CFG_001",
            ChartError::InternalError(_) => "INT_001",
        }
    }
}
