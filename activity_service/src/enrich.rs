use std::sync::Arc;

use alloy_primitives::U256;
use futures::future::join_all;
use sale_core::{AttributedSale, Listing, MarketSale, MetadataLookup, TraitMetadata};
use tracing::{debug, warn};

use crate::names::NameLookup;
use crate::records::{ActivityRecord, ListingCard};

/// Attaches plot metadata and ENS names to outgoing records
#[derive(Clone)]
pub struct RecordEnricher {
    metadata: Arc<dyn MetadataLookup>,
    names: NameLookup,
}

impl RecordEnricher {
    pub fn new(metadata: Arc<dyn MetadataLookup>, names: NameLookup) -> Self {
        Self { metadata, names }
    }

    pub fn names(&self) -> &NameLookup {
        &self.names
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataLookup> {
        &self.metadata
    }

    /// Dataset entry for the token, or the `Plot #<id>` placeholder
    pub async fn metadata_for(&self, token_id: &U256) -> TraitMetadata {
        let token_id = token_id.to_string();
        match self.metadata.get_metadata_for_token(&token_id).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                debug!("No metadata for token {}, using placeholder", token_id);
                TraitMetadata::placeholder(&token_id)
            }
            Err(e) => {
                warn!("Metadata lookup for token {} failed: {}", token_id, e);
                TraitMetadata::placeholder(&token_id)
            }
        }
    }

    pub async fn sale_records(&self, sales: &[AttributedSale]) -> Vec<ActivityRecord> {
        let metadata = join_all(sales.iter().map(|s| self.metadata_for(&s.token_id)));
        let names = self
            .names
            .lookup_many(sales.iter().flat_map(|s| [s.from_address, s.to_address]));
        let (metadata, names) = tokio::join!(metadata, names);

        sales
            .iter()
            .zip(metadata)
            .map(|(sale, metadata)| {
                ActivityRecord::from_sale(sale, metadata).with_names(
                    names.get(&sale.from_address).cloned(),
                    names.get(&sale.to_address).cloned(),
                )
            })
            .collect()
    }

    pub async fn market_sale_records(&self, sales: &[MarketSale]) -> Vec<ActivityRecord> {
        let metadata = join_all(sales.iter().map(|s| self.metadata_for(&s.token_id)));
        let addresses: Vec<_> = sales
            .iter()
            .flat_map(|s| [s.seller, s.buyer])
            .flatten()
            .collect();
        let names = self.names.lookup_many(addresses);
        let (metadata, names) = tokio::join!(metadata, names);

        sales
            .iter()
            .zip(metadata)
            .map(|(sale, metadata)| {
                let name_of = |a: Option<_>| a.and_then(|a| names.get(&a).cloned());
                ActivityRecord::from_market_sale(sale, metadata)
                    .with_names(name_of(sale.seller), name_of(sale.buyer))
            })
            .collect()
    }

    pub async fn listing_cards(&self, listings: &[Listing]) -> Vec<ListingCard> {
        let metadata = join_all(listings.iter().map(|l| self.metadata_for(&l.token_id))).await;
        listings
            .iter()
            .zip(metadata)
            .map(|(listing, metadata)| ListingCard::new(listing, metadata))
            .collect()
    }
}
