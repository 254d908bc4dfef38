use std::collections::HashSet;
use std::sync::Arc;

use sale_core::{ChainDataProvider, Marketplace, SaleAttributor, TransferQuery};
use tracing::{debug, info};

use crate::context::{unique_hashes, ContextFetcher};
use crate::enrich::RecordEnricher;
use crate::records::ActivityPage;
use crate::settings::ServiceSettings;
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct ActivityRequest {
    pub limit: Option<usize>,
    /// Cursor from a previous page
    pub page_key: Option<String>,
    /// Keep only sales settled through this venue
    pub marketplace: Option<Marketplace>,
}

/// Recent marketplace sales of the collection, newest first
pub struct ActivityAggregator {
    chain: Arc<dyn ChainDataProvider>,
    contexts: ContextFetcher,
    attributor: Arc<SaleAttributor>,
    enricher: RecordEnricher,
    settings: ServiceSettings,
}

impl ActivityAggregator {
    pub fn new(
        chain: Arc<dyn ChainDataProvider>,
        attributor: Arc<SaleAttributor>,
        enricher: RecordEnricher,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            contexts: ContextFetcher::new(chain.clone()),
            chain,
            attributor,
            enricher,
            settings,
        }
    }

    /// One page of sales. Only a failure of the transfer page itself is an error;
    /// transactions whose context cannot be fetched are skipped.
    pub async fn get_recent_activity(&self, request: ActivityRequest) -> Result<ActivityPage> {
        let limit = self.settings.clamp_limit(request.limit);
        let query = TransferQuery::collection(
            self.settings.collection,
            self.settings.transfer_page_size(limit),
        )
        .with_page_key(request.page_key.filter(|k| !k.is_empty()));

        let page = self.chain.get_asset_transfers(&query).await?;

        let requests = unique_hashes(&page.transfers);
        debug!(
            "{} transfers across {} transactions",
            page.transfers.len(),
            requests.len()
        );
        let contexts = self.contexts.fetch_all(&requests).await;

        let mut seen = HashSet::new();
        let mut sales = Vec::new();
        for transfer in &page.transfers {
            if !seen.insert((transfer.transaction_hash, transfer.token_id)) {
                continue;
            }
            let Some(context) = contexts.get(&transfer.transaction_hash) else {
                continue;
            };
            let sale = self.attributor.attribute(transfer, context, None);
            if !sale.is_sale() {
                continue;
            }
            if request.marketplace.is_some_and(|m| m != sale.marketplace) {
                continue;
            }
            sales.push(sale);
        }
        sales.truncate(limit);

        let activity = self.enricher.sale_records(&sales).await;
        info!(
            "Activity page: {} sales from {} transfers",
            activity.len(),
            page.transfers.len()
        );
        Ok(ActivityPage::new(activity, page.page_key))
    }
}
