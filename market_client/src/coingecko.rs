use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use retry_utils::{retry_with_backoff, RetryConfig};
use rust_decimal::Decimal;
use sale_core::{address_hex, CurrencyToken, FiatPriceSource};
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{MarketClientError, Result};
use crate::http::{build_client, send_json};

const PROVIDER: &str = "coingecko";

#[derive(Debug, Clone)]
pub struct CoinGeckoClientConfig {
    pub base_url: String,
    pub vs_currency: String,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
}

impl Default for CoinGeckoClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            vs_currency: "usd".to_string(),
            timeout_seconds: 10,
            retry: RetryConfig::default(),
        }
    }
}

/// Spot prices from the CoinGecko simple price endpoints
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    config: CoinGeckoClientConfig,
}

impl CoinGeckoClient {
    pub fn new(config: CoinGeckoClientConfig) -> Result<Self> {
        let client = build_client(config.timeout_seconds)?;
        Ok(Self { client, config })
    }

    /// Price of one unit of `token_contract`; the zero address and WETH price as ether
    pub async fn get_price(&self, token_contract: Address) -> Result<Option<Decimal>> {
        let native = token_contract == Address::ZERO
            || CurrencyToken::by_contract(&token_contract).is_some_and(|c| c.native_equivalent);

        let (url, params, key) = if native {
            (
                format!("{}/simple/price", self.config.base_url),
                vec![
                    ("ids", "ethereum".to_string()),
                    ("vs_currencies", self.config.vs_currency.clone()),
                ],
                "ethereum".to_string(),
            )
        } else {
            let contract = address_hex(&token_contract);
            (
                format!("{}/simple/token_price/ethereum", self.config.base_url),
                vec![
                    ("contract_addresses", contract.clone()),
                    ("vs_currencies", self.config.vs_currency.clone()),
                ],
                contract,
            )
        };

        let body: Value = retry_with_backoff(
            || send_json(PROVIDER, self.client.get(&url).query(&params)),
            &self.config.retry,
            MarketClientError::retry_class,
        )
        .await?;

        let price = extract_price(&body, &key, &self.config.vs_currency);
        match price {
            Some(price) => info!("{} price: {} {}", key, price, self.config.vs_currency),
            None => debug!("No {} price for {}", self.config.vs_currency, key),
        }
        Ok(price)
    }
}

/// `{ "<key>": { "<vs>": 0.0123 } }`, key compared case-insensitively
fn extract_price(body: &Value, key: &str, vs_currency: &str) -> Option<Decimal> {
    let entry = body.as_object()?.iter().find_map(|(k, v)| {
        k.eq_ignore_ascii_case(key).then_some(v)
    })?;
    let number = entry.get(vs_currency)?;
    let text = match number {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[async_trait]
impl FiatPriceSource for CoinGeckoClient {
    async fn get_unit_price_in_fiat(
        &self,
        token_contract: Address,
    ) -> sale_core::Result<Option<Decimal>> {
        self.get_price(token_contract)
            .await
            .map_err(|e| e.into_sale_error(PROVIDER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_token_price() {
        let body = json!({ "0x2a3bff78b79a009976eea096a51a948a3dc00e34": { "usd": 0.0123 } });
        assert_eq!(
            extract_price(&body, "0x2a3bff78b79a009976eea096a51a948a3dc00e34", "usd"),
            Some(Decimal::from_str("0.0123").unwrap())
        );
    }

    #[test]
    fn test_extract_handles_scientific_and_missing() {
        let body = json!({ "ethereum": { "usd": 1.5e-5 } });
        assert_eq!(
            extract_price(&body, "ethereum", "usd"),
            Some(Decimal::from_str("0.000015").unwrap())
        );
        assert_eq!(extract_price(&body, "ethereum", "eur"), None);
        assert_eq!(extract_price(&json!({}), "ethereum", "usd"), None);
    }
}
