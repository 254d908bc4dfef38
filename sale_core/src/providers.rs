//! Collaborator seams. Network clients implement these; the aggregators only see the traits.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::marketplace::Marketplace;
use crate::metadata::TraitMetadata;
use crate::types::{
    ListingPage, MarketSalePage, OwnedToken, TransactionInfo, TransactionReceipt, TransferPage,
    TransferQuery,
};
use crate::Result;

/// Blockchain data provider. Implementations retry transient failures themselves, so an
/// error returned here is final.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    async fn get_asset_transfers(&self, query: &TransferQuery) -> Result<TransferPage>;

    /// `Ok(None)` when the node does not know the transaction
    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>>;

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionInfo>>;

    async fn get_block_timestamp(&self, block_number: u64) -> Result<Option<DateTime<Utc>>>;

    /// Collection tokens currently held by `owner`
    async fn get_owned_tokens(&self, owner: Address, contract: Address) -> Result<Vec<OwnedToken>>;
}

/// Address/name resolution. Callers wrap every call in a timeout.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn lookup_address(&self, address: Address) -> Result<Option<String>>;

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>>;
}

#[async_trait]
pub trait FiatPriceSource: Send + Sync {
    /// Price of one whole token unit in the configured fiat currency
    async fn get_unit_price_in_fiat(&self, token_contract: Address) -> Result<Option<Decimal>>;
}

#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn get_metadata_for_token(&self, token_id: &str) -> Result<Option<TraitMetadata>>;
}

/// Filter for a marketplace sales feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesQuery {
    pub limit: u32,
    pub continuation: Option<String>,
}

#[async_trait]
pub trait ListingProvider: Send + Sync {
    fn marketplace(&self) -> Marketplace;

    async fn get_active_listings(&self, cursor: Option<String>) -> Result<ListingPage>;

    async fn get_sales(&self, query: &SalesQuery) -> Result<MarketSalePage>;
}
