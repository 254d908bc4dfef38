use std::sync::Arc;

use sale_core::{ListingProvider, Marketplace, SalesQuery};
use tracing::info;

use crate::enrich::RecordEnricher;
use crate::records::{ActivityPage, ListingsPage};
use crate::settings::ServiceSettings;
use crate::{Result, ServiceError};

/// Listings and marketplace-reported sales, one provider per venue
pub struct MarketAggregator {
    providers: Vec<Arc<dyn ListingProvider>>,
    enricher: RecordEnricher,
    settings: ServiceSettings,
}

impl MarketAggregator {
    pub fn new(
        providers: Vec<Arc<dyn ListingProvider>>,
        enricher: RecordEnricher,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            providers,
            enricher,
            settings,
        }
    }

    fn provider(&self, marketplace: Marketplace) -> Result<&Arc<dyn ListingProvider>> {
        self.providers
            .iter()
            .find(|p| p.marketplace() == marketplace)
            .ok_or_else(|| ServiceError::NotConfigured(marketplace.to_string()))
    }

    pub fn has_provider(&self, marketplace: Marketplace) -> bool {
        self.provider(marketplace).is_ok()
    }

    /// Active listings on `marketplace`, cheapest first
    pub async fn get_listings(
        &self,
        marketplace: Marketplace,
        cursor: Option<String>,
    ) -> Result<ListingsPage> {
        let page = self.provider(marketplace)?.get_active_listings(cursor).await?;

        let mut listings = page.listings;
        listings.sort_by(|a, b| a.price_amount.cmp(&b.price_amount));
        let cards = self.enricher.listing_cards(&listings).await;

        info!("{} listings: {}", marketplace, cards.len());
        Ok(ListingsPage {
            total_count: cards.len(),
            listings: cards,
            next_cursor: page.next_cursor,
        })
    }

    /// Sales as reported by the venue's own API, in the activity record shape
    pub async fn get_market_sales(
        &self,
        marketplace: Marketplace,
        limit: Option<usize>,
        continuation: Option<String>,
    ) -> Result<ActivityPage> {
        let limit = self.settings.clamp_limit(limit);
        let query = SalesQuery {
            limit: u32::try_from(limit).unwrap_or(u32::MAX),
            continuation: continuation.filter(|c| !c.is_empty()),
        };
        let page = self.provider(marketplace)?.get_sales(&query).await?;

        let mut sales = page.sales;
        sales.truncate(limit);
        let records = self.enricher.market_sale_records(&sales).await;

        info!("{} sales feed: {} records", marketplace, records.len());
        Ok(ActivityPage::new(records, page.continuation))
    }
}
