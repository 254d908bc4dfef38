use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::Address;
use futures::future::join_all;
use sale_core::{
    address_hex, AttributedSale, ChainDataProvider, Marketplace, RawTransfer, SaleAttributor,
    SaleKind, TransferPage, TransferQuery,
};
use tracing::info;

use crate::context::{unique_hashes, ContextFetcher};
use crate::enrich::RecordEnricher;
use crate::records::{ActivityKind, ActivityRecord, HeldPlot, HoldingsSummary};
use crate::settings::ServiceSettings;
use crate::Result;

/// Per-wallet views: transfer history from the wallet's side and current holdings
pub struct WalletAnalytics {
    chain: Arc<dyn ChainDataProvider>,
    contexts: ContextFetcher,
    attributor: Arc<SaleAttributor>,
    enricher: RecordEnricher,
    settings: ServiceSettings,
}

impl WalletAnalytics {
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

    async fn transfers(&self, query: TransferQuery) -> sale_core::Result<TransferPage> {
        self.chain.get_asset_transfers(&query).await
    }

    /// Every collection transfer into or out of `wallet`, newest first, typed from the
    /// wallet's side. Non-sale transfers are kept; mints are typed `mint`.
    pub async fn get_wallet_activity(
        &self,
        wallet: Address,
        limit: Option<usize>,
    ) -> Result<Vec<ActivityRecord>> {
        let limit = self.settings.clamp_limit(limit);
        let base = TransferQuery::collection(
            self.settings.collection,
            self.settings.transfer_page_size(limit),
        );
        let sent = TransferQuery {
            from_address: Some(wallet),
            ..base.clone()
        };
        let received = TransferQuery {
            to_address: Some(wallet),
            ..base
        };

        let (sent, received) =
            futures::try_join!(self.transfers(sent), self.transfers(received))?;
        let transfers = merge_newest_first(sent.transfers, received.transfers, limit);

        let requests = unique_hashes(transfers.iter().filter(|t| !t.is_mint()));
        let contexts = self.contexts.fetch_all(&requests).await;

        let mut sales = Vec::with_capacity(transfers.len());
        let mut mints = HashSet::new();
        for transfer in &transfers {
            if transfer.is_mint() {
                mints.insert((transfer.transaction_hash, transfer.token_id));
                sales.push(mint_record(transfer));
                continue;
            }
            let Some(context) = contexts.get(&transfer.transaction_hash) else {
                continue;
            };
            sales.push(self.attributor.attribute(transfer, context, Some(&wallet)));
        }

        let mut records = self.enricher.sale_records(&sales).await;
        for (record, sale) in records.iter_mut().zip(&sales) {
            if mints.contains(&(sale.transaction_hash, sale.token_id)) {
                record.kind = ActivityKind::Mint;
            }
        }

        info!(
            "Wallet {}: {} activity records from {} transfers",
            address_hex(&wallet),
            records.len(),
            transfers.len()
        );
        Ok(records)
    }

    /// Collection plots currently held by `wallet`
    pub async fn get_holdings(&self, wallet: Address) -> Result<HoldingsSummary> {
        let owned = self
            .chain
            .get_owned_tokens(wallet, self.settings.collection)
            .await?;

        let metadata =
            join_all(owned.iter().map(|t| self.enricher.metadata_for(&t.token_id))).await;
        let tokens = owned
            .into_iter()
            .zip(metadata)
            .map(|(token, metadata)| {
                let name = match (&token.name, metadata.placeholder) {
                    (Some(name), true) if !name.is_empty() => name.clone(),
                    _ => metadata.name.clone(),
                };
                HeldPlot {
                    token_id: token.token_id.to_string(),
                    name,
                    metadata,
                }
            })
            .collect();

        let summary = HoldingsSummary::new(address_hex(&wallet), tokens);
        info!("Wallet {} holds {} plots", summary.address, summary.total);
        Ok(summary)
    }
}

/// Both lists arrive newest first; merge by block, drop repeats (a self-transfer shows up
/// in both), keep `limit`
fn merge_newest_first(
    sent: Vec<RawTransfer>,
    received: Vec<RawTransfer>,
    limit: usize,
) -> Vec<RawTransfer> {
    let mut merged: Vec<RawTransfer> = sent.into_iter().chain(received).collect();
    merged.sort_by(|a, b| {
        b.block_number
            .cmp(&a.block_number)
            .then_with(|| b.block_timestamp.cmp(&a.block_timestamp))
    });

    let mut seen = HashSet::new();
    merged.retain(|t| seen.insert((t.transaction_hash, t.token_id)));
    merged.truncate(limit);
    merged
}

fn mint_record(transfer: &RawTransfer) -> AttributedSale {
    AttributedSale {
        token_id: transfer.token_id,
        from_address: transfer.from_address,
        to_address: transfer.to_address,
        consideration: None,
        kind: SaleKind::Transfer,
        marketplace: Marketplace::Unknown,
        timestamp: transfer.block_timestamp,
        transaction_hash: transfer.transaction_hash,
        block_number: Some(transfer.block_number),
        bundle_size: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, U256};

    fn transfer(hash: u8, token: u64, block: u64) -> RawTransfer {
        RawTransfer {
            transaction_hash: B256::repeat_byte(hash),
            token_id: U256::from(token),
            from_address: Address::repeat_byte(1),
            to_address: Address::repeat_byte(2),
            block_timestamp: None,
            block_number: block,
        }
    }

    #[test]
    fn test_merge_orders_by_block_and_dedups() {
        let sent = vec![transfer(3, 1, 30), transfer(1, 2, 10)];
        let received = vec![transfer(4, 3, 40), transfer(3, 1, 30), transfer(2, 4, 20)];
        let merged = merge_newest_first(sent, received, 10);
        let blocks: Vec<u64> = merged.iter().map(|t| t.block_number).collect();
        assert_eq!(blocks, vec![40, 30, 20, 10]);
    }

    #[test]
    fn test_merge_truncates() {
        let merged = merge_newest_first(vec![transfer(1, 1, 5)], vec![transfer(2, 2, 6)], 1);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].block_number, 6);
    }
}
