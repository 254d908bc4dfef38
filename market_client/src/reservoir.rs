use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use retry_utils::{pace, retry_with_backoff, RetryConfig};
use sale_core::{
    address_hex, CurrencyToken, ListingPage, ListingProvider, MarketSalePage, Marketplace,
    SalesQuery, WILD,
};
use tracing::{debug, info, warn};

use crate::error::{MarketClientError, Result};
use crate::http::{build_client, send_json};
use crate::types::{ReservoirAsksResponse, ReservoirSalesResponse};

const PROVIDER: &str = "reservoir";

#[derive(Debug, Clone)]
pub struct ReservoirClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub collection_contract: Address,
    /// Only asks priced in this currency are returned
    pub payment_currency: CurrencyToken,
    /// Venue the asks are reported under
    pub marketplace: Marketplace,
    pub timeout_seconds: u64,
    pub max_listings: usize,
    pub page_limit: u32,
    pub page_delay_ms: u64,
    pub retry: RetryConfig,
}

impl ReservoirClientConfig {
    pub fn new(api_key: impl Into<String>, collection_contract: Address) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.reservoir.tools".to_string(),
            collection_contract,
            payment_currency: WILD,
            marketplace: Marketplace::Wwmm,
            timeout_seconds: 30,
            max_listings: 50,
            page_limit: 10,
            page_delay_ms: 500,
            retry: RetryConfig::default(),
        }
    }
}

/// Reservoir asks and sales, used for the WILD-priced WWMM feed
#[derive(Debug, Clone)]
pub struct ReservoirClient {
    client: Client,
    config: ReservoirClientConfig,
}

impl ReservoirClient {
    pub fn new(config: ReservoirClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(MarketClientError::Configuration(
                "Reservoir API key is required".to_string(),
            ));
        }
        let client = build_client(config.timeout_seconds)?;
        Ok(Self { client, config })
    }

    fn asks_query(&self, continuation: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("contract", address_hex(&self.config.collection_contract)),
            ("status", "active".to_string()),
            ("sortBy", "price".to_string()),
            ("limit", self.config.page_limit.to_string()),
            ("includeCriteriaMetadata", "true".to_string()),
            ("includeRawData", "false".to_string()),
            ("normalizeRoyalties", "true".to_string()),
        ];
        if let Some(contract) = self.config.payment_currency.contract_address {
            query.push(("payment", address_hex(&contract)));
        }
        if let Some(continuation) = continuation {
            query.push(("continuation", continuation.to_string()));
        }
        query
    }

    async fn asks_page(&self, continuation: Option<&str>) -> Result<ReservoirAsksResponse> {
        let url = format!("{}/orders/asks/v4", self.config.base_url);
        let request = self
            .client
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .query(&self.asks_query(continuation));
        send_json(PROVIDER, request).await
    }

    /// Active asks in the payment currency, paced between pages
    pub async fn get_active_listings(&self, cursor: Option<String>) -> Result<ListingPage> {
        let mut listings = Vec::new();
        let mut continuation = cursor.filter(|c| !c.is_empty());

        loop {
            let page = retry_with_backoff(
                || self.asks_page(continuation.as_deref()),
                &self.config.retry,
                MarketClientError::retry_class,
            )
            .await?;

            let received = page.orders.len();
            for order in page.orders {
                if !order.is_active() || !order.is_priced_in(&self.config.payment_currency) {
                    continue;
                }
                match order.into_listing(self.config.marketplace) {
                    Ok(listing) => listings.push(listing),
                    Err(e) => warn!("Skipping Reservoir ask: {}", e),
                }
            }
            debug!("Reservoir page: {} orders, {} kept so far", received, listings.len());

            continuation = page.continuation.filter(|c| !c.is_empty());
            if continuation.is_none() || listings.len() >= self.config.max_listings {
                break;
            }
            pace(self.config.page_delay_ms).await;
        }

        listings.truncate(self.config.max_listings);
        info!(
            "Fetched {} {} asks from Reservoir",
            listings.len(),
            self.config.payment_currency.symbol
        );
        Ok(ListingPage {
            listings,
            next_cursor: continuation,
        })
    }

    pub async fn get_sales(&self, query: &SalesQuery) -> Result<MarketSalePage> {
        let url = format!("{}/sales/v6", self.config.base_url);
        let mut params = vec![
            ("contract", address_hex(&self.config.collection_contract)),
            ("limit", query.limit.clamp(1, 100).to_string()),
        ];
        if let Some(continuation) = query.continuation.as_deref().filter(|c| !c.is_empty()) {
            params.push(("continuation", continuation.to_string()));
        }

        let response: ReservoirSalesResponse = retry_with_backoff(
            || {
                let request = self
                    .client
                    .get(&url)
                    .header("x-api-key", &self.config.api_key)
                    .query(&params);
                send_json(PROVIDER, request)
            },
            &self.config.retry,
            MarketClientError::retry_class,
        )
        .await?;

        let mut sales = Vec::with_capacity(response.sales.len());
        for sale in response.sales {
            match sale.into_sale(self.config.marketplace) {
                Ok(Some(sale)) => sales.push(sale),
                Ok(None) => {}
                Err(e) => warn!("Skipping Reservoir sale: {}", e),
            }
        }

        Ok(MarketSalePage {
            sales,
            continuation: response.continuation.filter(|c| !c.is_empty()),
        })
    }
}

#[async_trait]
impl ListingProvider for ReservoirClient {
    fn marketplace(&self) -> Marketplace {
        self.config.marketplace
    }

    async fn get_active_listings(&self, cursor: Option<String>) -> sale_core::Result<ListingPage> {
        ReservoirClient::get_active_listings(self, cursor)
            .await
            .map_err(|e| e.into_sale_error(PROVIDER))
    }

    async fn get_sales(&self, query: &SalesQuery) -> sale_core::Result<MarketSalePage> {
        ReservoirClient::get_sales(self, query)
            .await
            .map_err(|e| e.into_sale_error(PROVIDER))
    }
}
