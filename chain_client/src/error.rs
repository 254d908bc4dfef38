use retry_utils::{RetryableError, TimedOut};
use sale_core::SaleError;
use thiserror::Error;

const PROVIDER: &str = "alchemy";

#[derive(Error, Debug)]
pub enum ChainClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timed out")]
    Timeout(#[from] TimedOut),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ChainClientError {
    pub fn retry_class(&self) -> RetryableError {
        match self {
            ChainClientError::RateLimit => RetryableError::RateLimit,
            ChainClientError::ServerError { .. } => RetryableError::ServerError,
            ChainClientError::Timeout(_) => RetryableError::Timeout,
            ChainClientError::HttpError(e) if e.is_timeout() => RetryableError::Timeout,
            ChainClientError::HttpError(e) if e.is_connect() || e.is_request() => {
                RetryableError::ServerError
            }
            // -32005 is Alchemy's "limit exceeded" JSON-RPC code
            ChainClientError::RpcError { code: -32005, .. } => RetryableError::RateLimit,
            ChainClientError::RpcError { code, .. } if (-32099..=-32000).contains(code) => {
                RetryableError::ServerError
            }
            _ => RetryableError::Other,
        }
    }
}

impl From<ChainClientError> for SaleError {
    fn from(err: ChainClientError) -> Self {
        match err {
            ChainClientError::RateLimit => SaleError::RateLimited {
                provider: PROVIDER.to_string(),
            },
            ChainClientError::Timeout(_) => SaleError::Timeout {
                provider: PROVIDER.to_string(),
            },
            ChainClientError::HttpError(e) if e.is_timeout() => SaleError::Timeout {
                provider: PROVIDER.to_string(),
            },
            ChainClientError::ParseError { message } => SaleError::Malformed(message),
            ChainClientError::JsonError(e) => SaleError::Malformed(e.to_string()),
            ChainClientError::Configuration(message) => SaleError::Configuration(message),
            other => SaleError::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainClientError>;
