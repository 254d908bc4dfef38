use async_trait::async_trait;
use reqwest::Client;
use retry_utils::{retry_with_backoff, RetryConfig};
use sale_core::{ListingPage, ListingProvider, MarketSalePage, Marketplace, SalesQuery};
use tracing::{debug, info, warn};

use crate::error::{MarketClientError, Result};
use crate::http::{build_client, send_json};
use crate::types::{OpenSeaEventsResponse, OpenSeaListingsResponse};

const PROVIDER: &str = "opensea";

#[derive(Debug, Clone)]
pub struct OpenSeaClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub collection_slug: String,
    pub timeout_seconds: u64,
    /// Stop paging once this many listings are collected
    pub max_listings: usize,
    pub page_size: u32,
    pub retry: RetryConfig,
}

impl Default for OpenSeaClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.opensea.io/api/v2".to_string(),
            collection_slug: "wilder-land-the-island".to_string(),
            timeout_seconds: 30,
            max_listings: 200,
            page_size: 50,
            retry: RetryConfig::default(),
        }
    }
}

/// OpenSea v2 listings and sale events for one collection
#[derive(Debug, Clone)]
pub struct OpenSeaClient {
    client: Client,
    config: OpenSeaClientConfig,
}

impl OpenSeaClient {
    pub fn new(config: OpenSeaClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(MarketClientError::Configuration(
                "OpenSea API key is required".to_string(),
            ));
        }
        let client = build_client(config.timeout_seconds)?;
        Ok(Self { client, config })
    }

    async fn listings_page(&self, next: Option<&str>) -> Result<OpenSeaListingsResponse> {
        let url = format!(
            "{}/listings/collection/{}/all",
            self.config.base_url, self.config.collection_slug
        );
        let mut query = vec![("limit", self.config.page_size.to_string())];
        if let Some(next) = next {
            query.push(("next", next.to_string()));
        }
        let request = self
            .client
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .query(&query);
        send_json(PROVIDER, request).await
    }

    /// Active listings starting at `cursor`, paging until `max_listings` or the last page
    pub async fn get_active_listings(&self, cursor: Option<String>) -> Result<ListingPage> {
        let mut listings = Vec::new();
        let mut next = cursor.filter(|c| !c.is_empty());

        loop {
            let page = retry_with_backoff(
                || self.listings_page(next.as_deref()),
                &self.config.retry,
                MarketClientError::retry_class,
            )
            .await?;

            for raw in page.listings {
                match raw.into_listing() {
                    Ok(listing) => listings.push(listing),
                    Err(e) => warn!("Skipping OpenSea listing: {}", e),
                }
            }

            next = page.next.filter(|n| !n.is_empty());
            if next.is_none() || listings.len() >= self.config.max_listings {
                break;
            }
            debug!("OpenSea listings so far: {}", listings.len());
        }

        info!("Fetched {} OpenSea listings", listings.len());
        Ok(ListingPage {
            listings,
            next_cursor: next,
        })
    }

    /// One page of collection sale events, newest first
    pub async fn get_sales(&self, query: &SalesQuery) -> Result<MarketSalePage> {
        let url = format!(
            "{}/events/collection/{}",
            self.config.base_url, self.config.collection_slug
        );
        let mut params = vec![
            ("event_type", "sale".to_string()),
            ("limit", query.limit.clamp(1, 50).to_string()),
        ];
        if let Some(next) = query.continuation.as_deref().filter(|c| !c.is_empty()) {
            params.push(("next", next.to_string()));
        }

        let response: OpenSeaEventsResponse = retry_with_backoff(
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

        let mut sales = Vec::with_capacity(response.asset_events.len());
        for event in response.asset_events {
            match event.into_sale() {
                Ok(Some(sale)) => sales.push(sale),
                Ok(None) => {}
                Err(e) => warn!("Skipping OpenSea sale event: {}", e),
            }
        }

        info!("Fetched {} OpenSea sales", sales.len());
        Ok(MarketSalePage {
            sales,
            continuation: response.next.filter(|n| !n.is_empty()),
        })
    }
}

#[async_trait]
impl ListingProvider for OpenSeaClient {
    fn marketplace(&self) -> Marketplace {
        Marketplace::OpenSea
    }

    async fn get_active_listings(&self, cursor: Option<String>) -> sale_core::Result<ListingPage> {
        OpenSeaClient::get_active_listings(self, cursor)
            .await
            .map_err(|e| e.into_sale_error(PROVIDER))
    }

    async fn get_sales(&self, query: &SalesQuery) -> sale_core::Result<MarketSalePage> {
        OpenSeaClient::get_sales(self, query)
            .await
            .map_err(|e| e.into_sale_error(PROVIDER))
    }
}
