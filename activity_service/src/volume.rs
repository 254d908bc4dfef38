use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use retry_utils::pace;
use sale_core::{
    ChainDataProvider, CurrencyToken, FiatPriceSource, Marketplace, RawTransfer, SaleAttributor,
    TransferQuery, VolumeAccumulator, VolumeStats, ETH,
};
use tracing::{debug, info, warn};

use crate::context::{unique_hashes, ContextFetcher};
use crate::settings::ServiceSettings;
use crate::Result;

/// Trailing 1d / 7d / all-time sale volume.
///
/// Transfers are paged newest first until a page reaches back past the lookback window,
/// so "all time" covers what was fetched, not the full collection history.
pub struct VolumeStatsAggregator {
    chain: Arc<dyn ChainDataProvider>,
    contexts: ContextFetcher,
    attributor: Arc<SaleAttributor>,
    prices: Option<Arc<dyn FiatPriceSource>>,
    settings: ServiceSettings,
}

impl VolumeStatsAggregator {
    pub fn new(
        chain: Arc<dyn ChainDataProvider>,
        attributor: Arc<SaleAttributor>,
        prices: Option<Arc<dyn FiatPriceSource>>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            contexts: ContextFetcher::new(chain.clone()),
            chain,
            attributor,
            prices,
            settings,
        }
    }

    /// Currency volume is summed in: ETH for native-equivalent venues, otherwise the venue's own
    pub fn volume_unit(marketplace: Option<Marketplace>) -> CurrencyToken {
        match marketplace.and_then(|m| m.settlement_currency()) {
            Some(currency) if !currency.native_equivalent => currency,
            _ => ETH,
        }
    }

    pub async fn get_volume_stats(&self, marketplace: Option<Marketplace>) -> Result<VolumeStats> {
        self.get_volume_stats_at(Utc::now(), marketplace).await
    }

    pub async fn get_volume_stats_at(
        &self,
        now: DateTime<Utc>,
        marketplace: Option<Marketplace>,
    ) -> Result<VolumeStats> {
        let unit = Self::volume_unit(marketplace);
        let transfers = self.recent_transfers(now).await?;

        let requests = unique_hashes(&transfers);
        let contexts = self
            .contexts
            .fetch_in_batches(&requests, self.settings.batch_size, self.settings.batch_delay_ms)
            .await;

        let mut accumulator = VolumeAccumulator::new(now, unit);
        let mut seen = HashSet::new();
        for transfer in &transfers {
            if !seen.insert((transfer.transaction_hash, transfer.token_id)) {
                continue;
            }
            let Some(context) = contexts.get(&transfer.transaction_hash) else {
                continue;
            };
            let sale = self.attributor.attribute(transfer, context, None);
            if marketplace.is_some_and(|m| m != sale.marketplace) {
                continue;
            }
            accumulator.add(&sale);
        }

        let price = self.unit_price(&unit).await;
        let stats = accumulator.finish(price);
        info!(
            "Volume ({}): 1d {} / 7d {} / all {} {} from {} sales",
            marketplace.map(|m| m.as_str()).unwrap_or("all markets"),
            stats.one_day.total_volume,
            stats.seven_day.total_volume,
            stats.all_time.total_volume,
            stats.currency_symbol,
            stats.sales_considered
        );
        Ok(stats)
    }

    /// Pages transfers until one reaches past the lookback window. A failed first page is an
    /// error; a failure further back ends paging with what was collected.
    async fn recent_transfers(&self, now: DateTime<Utc>) -> Result<Vec<RawTransfer>> {
        let cutoff = now - self.settings.volume_lookback;
        let mut transfers = Vec::new();
        let mut page_key: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let query = TransferQuery::collection(
                self.settings.collection,
                self.settings.volume_transfer_page_size(),
            )
            .with_page_key(page_key.take());

            let page = match self.chain.get_asset_transfers(&query).await {
                Ok(page) => page,
                Err(e) if pages == 0 => return Err(e.into()),
                Err(e) => {
                    warn!("Stopping volume paging after {} pages: {}", pages, e);
                    break;
                }
            };
            pages += 1;

            let oldest = page.transfers.iter().filter_map(|t| t.block_timestamp).min();
            transfers.extend(page.transfers);

            let Some(next) = page.page_key.filter(|k| !k.is_empty()) else {
                break;
            };
            if oldest.is_some_and(|t| t < cutoff) {
                debug!("Page {} reaches past {}, stopping", pages, cutoff);
                break;
            }
            if pages >= self.settings.max_volume_pages {
                warn!("Volume paging hit the {} page cap", pages);
                break;
            }
            page_key = Some(next);
            pace(self.settings.page_delay_ms).await;
        }

        debug!("Collected {} transfers over {} pages", transfers.len(), pages);
        Ok(transfers)
    }

    /// Best effort; `None` when no price source is configured or the lookup fails
    async fn unit_price(&self, unit: &CurrencyToken) -> Option<rust_decimal::Decimal> {
        let prices = self.prices.as_ref()?;
        let contract = unit.contract_address.unwrap_or(Address::ZERO);
        match prices.get_unit_price_in_fiat(contract).await {
            Ok(price) => price,
            Err(e) => {
                warn!("Fiat price for {} unavailable: {}", unit.symbol, e);
                None
            }
        }
    }
}
