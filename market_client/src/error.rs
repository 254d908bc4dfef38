use retry_utils::RetryableError;
use sale_core::SaleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    AuthError,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MarketClientError {
    pub fn retry_class(&self) -> RetryableError {
        match self {
            MarketClientError::RateLimit => RetryableError::RateLimit,
            MarketClientError::ServerError { .. } => RetryableError::ServerError,
            MarketClientError::HttpError(e) if e.is_timeout() => RetryableError::Timeout,
            MarketClientError::HttpError(e) if e.is_connect() || e.is_request() => {
                RetryableError::ServerError
            }
            _ => RetryableError::Other,
        }
    }

    /// Map into the domain error, naming the provider that failed
    pub fn into_sale_error(self, provider: &str) -> SaleError {
        let provider = provider.to_string();
        match self {
            MarketClientError::RateLimit => SaleError::RateLimited { provider },
            MarketClientError::HttpError(e) if e.is_timeout() => SaleError::Timeout { provider },
            MarketClientError::ParseError { message } => SaleError::Malformed(message),
            MarketClientError::JsonError(e) => SaleError::Malformed(e.to_string()),
            MarketClientError::Configuration(message) => SaleError::Configuration(message),
            other => SaleError::ProviderUnavailable {
                provider,
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketClientError>;
