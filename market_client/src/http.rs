use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{MarketClientError, Result};

pub(crate) fn build_client(timeout_seconds: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()?)
}

/// Send a request and decode a JSON body, mapping HTTP status codes to error variants
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T> {
    let response = request.header("accept", "application/json").send().await?;
    let status = response.status();
    debug!("{} responded {}", provider, status);

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        error!("{} API error - Status: {}, Body: {}", provider, status, text);
        return Err(match status.as_u16() {
            401 | 403 => MarketClientError::AuthError,
            429 => MarketClientError::RateLimit,
            code if status.is_server_error() => MarketClientError::ServerError {
                status: code,
                message: text,
            },
            code => MarketClientError::ApiError {
                status: code,
                message: text,
            },
        });
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}
