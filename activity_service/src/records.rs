//! Normalized JSON records handed to the rendering layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sale_core::{
    address_hex, format_units, AttributedSale, Listing, MarketSale, Marketplace, SaleKind,
    TraitMetadata,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Sale,
    Bought,
    Sold,
    Transfer,
    Mint,
}

impl From<SaleKind> for ActivityKind {
    fn from(kind: SaleKind) -> Self {
        match kind {
            SaleKind::Sale => ActivityKind::Sale,
            SaleKind::Bought => ActivityKind::Bought,
            SaleKind::Sold => ActivityKind::Sold,
            SaleKind::Transfer => ActivityKind::Transfer,
        }
    }
}

/// One activity feed entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub token_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub marketplace: Marketplace,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_ens: Option<String>,
    pub to_ens: Option<String>,
    /// Smallest-unit amount as a decimal string
    pub price_amount: Option<String>,
    /// `price_amount` in whole currency units
    pub price: Option<String>,
    pub currency_symbol: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub transaction_hash: Option<String>,
    pub block_number: Option<u64>,
    pub bundle_size: usize,
    pub metadata: TraitMetadata,
}

impl ActivityRecord {
    pub fn from_sale(sale: &AttributedSale, metadata: TraitMetadata) -> Self {
        Self {
            token_id: sale.token_id.to_string(),
            name: metadata.name.clone(),
            kind: sale.kind.into(),
            marketplace: sale.marketplace,
            from_address: Some(address_hex(&sale.from_address)),
            to_address: Some(address_hex(&sale.to_address)),
            from_ens: None,
            to_ens: None,
            price_amount: sale.consideration_amount().map(|a| a.to_string()),
            price: sale.price_display(),
            currency_symbol: sale.currency_symbol().map(str::to_string),
            timestamp: sale.timestamp,
            transaction_hash: Some(format!("{:#x}", sale.transaction_hash)),
            block_number: sale.block_number,
            bundle_size: sale.bundle_size,
            metadata,
        }
    }

    pub fn from_market_sale(sale: &MarketSale, metadata: TraitMetadata) -> Self {
        let name = sale.name.clone().unwrap_or_else(|| metadata.name.clone());
        Self {
            token_id: sale.token_id.to_string(),
            name,
            kind: ActivityKind::Sale,
            marketplace: sale.marketplace,
            from_address: sale.seller.as_ref().map(address_hex),
            to_address: sale.buyer.as_ref().map(address_hex),
            from_ens: None,
            to_ens: None,
            price_amount: Some(sale.price_amount.to_string()),
            price: Some(format_units(sale.price_amount, sale.currency_decimals)),
            currency_symbol: Some(sale.currency_symbol.clone()),
            timestamp: Some(sale.timestamp),
            transaction_hash: sale.transaction_hash.map(|h| format!("{:#x}", h)),
            block_number: None,
            bundle_size: 1,
            metadata,
        }
    }

    pub fn with_names(mut self, from_ens: Option<String>, to_ens: Option<String>) -> Self {
        self.from_ens = from_ens;
        self.to_ens = to_ens;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPage {
    pub activity: Vec<ActivityRecord>,
    /// Provider cursor, passed back verbatim for the next page
    pub next_page_key: Option<String>,
    pub total_count: usize,
}

impl ActivityPage {
    pub fn new(activity: Vec<ActivityRecord>, next_page_key: Option<String>) -> Self {
        Self {
            total_count: activity.len(),
            activity,
            next_page_key,
        }
    }
}

/// Active listing ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCard {
    pub order_id: String,
    pub token_id: String,
    pub price_amount: String,
    pub price_display: String,
    pub currency_symbol: String,
    pub marketplace: Marketplace,
    pub maker: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: TraitMetadata,
}

impl ListingCard {
    pub fn new(listing: &Listing, metadata: TraitMetadata) -> Self {
        Self {
            order_id: listing.order_id.clone(),
            token_id: listing.token_id.to_string(),
            price_amount: listing.price_amount.to_string(),
            price_display: format_units(listing.price_amount, listing.currency_decimals),
            currency_symbol: listing.currency_symbol.clone(),
            marketplace: listing.marketplace,
            maker: listing.maker.as_ref().map(address_hex),
            expires_at: listing.expires_at,
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingsPage {
    pub listings: Vec<ListingCard>,
    pub next_cursor: Option<String>,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldPlot {
    pub token_id: String,
    pub name: String,
    pub metadata: TraitMetadata,
}

/// Plots held by one wallet, grouped by zoning and neighborhood
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsSummary {
    pub address: String,
    pub total: usize,
    pub tokens: Vec<HeldPlot>,
    pub by_zoning: BTreeMap<String, usize>,
    pub by_neighborhood: BTreeMap<String, usize>,
}

impl HoldingsSummary {
    pub fn new(address: String, tokens: Vec<HeldPlot>) -> Self {
        let mut by_zoning = BTreeMap::new();
        let mut by_neighborhood = BTreeMap::new();
        for plot in &tokens {
            *by_zoning.entry(plot.metadata.zoning_type.clone()).or_insert(0) += 1;
            *by_neighborhood
                .entry(plot.metadata.neighborhood.clone())
                .or_insert(0) += 1;
        }
        Self {
            address,
            total: tokens.len(),
            tokens,
            by_zoning,
            by_neighborhood,
        }
    }
}
