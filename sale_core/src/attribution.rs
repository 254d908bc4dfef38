use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::amount::{format_units, to_decimal};
use crate::currency::{CurrencyToken, ETH};
use crate::decoder::{decode_transfer_logs, DecodedTransferLogs};
use crate::marketplace::{Marketplace, MarketplaceRegistry};
use crate::types::{RawTransfer, TransactionContext};

/// Outcome of attributing one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleKind {
    /// Marketplace sale observed without a perspective
    Sale,
    /// The perspective address received the token
    Bought,
    /// The perspective address sent the token
    Sold,
    /// No reliable price signal
    Transfer,
}

impl SaleKind {
    pub fn is_sale(&self) -> bool {
        !matches!(self, SaleKind::Transfer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleKind::Sale => "sale",
            SaleKind::Bought => "bought",
            SaleKind::Sold => "sold",
            SaleKind::Transfer => "transfer",
        }
    }
}

/// Amount paid for one token, always nonzero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Consideration {
    pub amount: U256,
    pub currency: CurrencyToken,
}

impl Consideration {
    pub fn display_amount(&self) -> String {
        format_units(self.amount, self.currency.decimals)
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        to_decimal(self.amount, self.currency.decimals)
    }
}

/// A transfer after attribution. Derived per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributedSale {
    pub token_id: U256,
    pub from_address: Address,
    pub to_address: Address,
    pub consideration: Option<Consideration>,
    pub kind: SaleKind,
    pub marketplace: Marketplace,
    pub timestamp: Option<DateTime<Utc>>,
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    /// Distinct collection tokens settled in the same transaction
    pub bundle_size: usize,
}

impl AttributedSale {
    pub fn is_sale(&self) -> bool {
        self.kind.is_sale()
    }

    pub fn consideration_amount(&self) -> Option<U256> {
        self.consideration.map(|c| c.amount)
    }

    pub fn currency_symbol(&self) -> Option<&'static str> {
        self.consideration.map(|c| c.currency.symbol)
    }

    pub fn price_display(&self) -> Option<String> {
        self.consideration.map(|c| c.display_amount())
    }
}

/// Decides whether a collection transfer was a marketplace sale and what was paid.
///
/// Pure over its inputs: the same transfer and context always yield the same result.
#[derive(Debug, Clone)]
pub struct SaleAttributor {
    collection: Address,
    currencies: Vec<CurrencyToken>,
    marketplaces: MarketplaceRegistry,
}

impl SaleAttributor {
    pub fn new(collection: Address) -> Self {
        Self {
            collection,
            currencies: CurrencyToken::wrapped_defaults(),
            marketplaces: MarketplaceRegistry::default(),
        }
    }

    /// ERC-20 currencies to decode, in preference order
    pub fn with_currencies(mut self, currencies: Vec<CurrencyToken>) -> Self {
        self.currencies = currencies;
        self
    }

    pub fn collection(&self) -> Address {
        self.collection
    }

    pub fn attribute(
        &self,
        transfer: &RawTransfer,
        context: &TransactionContext,
        perspective: Option<&Address>,
    ) -> AttributedSale {
        let timestamp = transfer.block_timestamp.or(context.block_timestamp);
        let decoded = decode_transfer_logs(&context.logs, self.collection, &self.currencies);

        let mut result = AttributedSale {
            token_id: transfer.token_id,
            from_address: transfer.from_address,
            to_address: transfer.to_address,
            consideration: None,
            kind: SaleKind::Transfer,
            marketplace: Marketplace::Unknown,
            timestamp,
            transaction_hash: transfer.transaction_hash,
            block_number: context.block_number.or(Some(transfer.block_number)),
            bundle_size: decoded.bundle_size().max(1),
        };

        let Some(nft) = decoded.nft_transfer_matching(
            transfer.token_id,
            transfer.from_address,
            transfer.to_address,
        ) else {
            debug!(
                "No collection transfer log for token {} in {}",
                transfer.token_id, transfer.transaction_hash
            );
            return result;
        };
        result.from_address = nft.from;
        result.to_address = nft.to;
        let (seller, buyer) = decoded
            .endpoints_for(transfer.token_id)
            .unwrap_or((nft.from, nft.to));

        let Some(marketplace) = self.marketplaces.classify(context.to_address.as_ref()) else {
            return result;
        };
        result.marketplace = marketplace;

        let total =
            total_consideration(&decoded, context.native_value, marketplace, &self.currencies);
        let Some(total) = total else {
            debug!(
                "{} settled {} with zero consideration",
                marketplace, transfer.transaction_hash
            );
            return result;
        };

        let share = split_for_token(&decoded, transfer.token_id, total.amount);
        if share.is_zero() {
            return result;
        }
        result.consideration = Some(Consideration {
            amount: share,
            currency: total.currency,
        });
        // a routed sale is reported seller to buyer, not leg by leg
        result.from_address = seller;
        result.to_address = buyer;

        result.kind = match perspective {
            Some(p) if *p == buyer => SaleKind::Bought,
            Some(p) if *p == seller => SaleKind::Sold,
            _ => SaleKind::Sale,
        };
        result
    }
}

/// Native value wins the label whenever it is nonzero; a native-equivalent wrapped leg is
/// added to it. Otherwise the venue's settlement currency is preferred, then the first
/// watched currency with a nonzero total.
fn total_consideration(
    decoded: &DecodedTransferLogs,
    native_value: U256,
    marketplace: Marketplace,
    currencies: &[CurrencyToken],
) -> Option<Consideration> {
    let preferred = marketplace
        .settlement_currency()
        .filter(|c| currencies.contains(c));
    let wrapped = preferred
        .into_iter()
        .chain(currencies.iter().copied())
        .map(|c| (c, decoded.currency_total(&c)))
        .find(|(_, total)| !total.is_zero());

    if !native_value.is_zero() {
        let mut amount = native_value;
        if let Some((currency, total)) = wrapped {
            if currency.same_unit(&ETH) {
                amount = amount.saturating_add(total);
            }
        }
        return Some(Consideration {
            amount,
            currency: ETH,
        });
    }

    wrapped.map(|(currency, amount)| Consideration { amount, currency })
}

/// Even split across a bundle; the remainder goes to the first token in log order
fn split_for_token(decoded: &DecodedTransferLogs, token_id: U256, total: U256) -> U256 {
    let size = decoded.bundle_size();
    if size <= 1 {
        return total;
    }
    let count = U256::from(size);
    let share = total / count;
    let first = decoded.nft_transfers.first().map(|t| t.token_id);
    if first == Some(token_id) {
        share + total % count
    } else {
        share
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{WETH, WILD};
    use crate::decoder::test_logs::{erc20_log, nft_log};
    use crate::types::LogEntry;
    use alloy_primitives::address;

    const LAND: Address = address!("d396ca541F501F5D303166C509e2045848df356b");
    const SEAPORT: Address = address!("00000000000000ADc04C56Bf30aC9d3c0aAF14dC");
    const WWMM_V2: Address = address!("5ebc127fae83ed5bdd91fc6a5f5767E259dF5642");
    const SELLER: Address = address!("1111111111111111111111111111111111111111");
    const BUYER: Address = address!("2222222222222222222222222222222222222222");

    fn hash(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    fn raw(hash_byte: u8, token_id: u64) -> RawTransfer {
        RawTransfer {
            transaction_hash: hash(hash_byte),
            token_id: U256::from(token_id),
            from_address: SELLER,
            to_address: BUYER,
            block_timestamp: None,
            block_number: 100,
        }
    }

    fn context(to: Address, logs: Vec<LogEntry>, native: U256) -> TransactionContext {
        TransactionContext {
            transaction_hash: hash(0xaa),
            to_address: Some(to),
            logs,
            native_value: native,
            block_number: Some(100),
            block_timestamp: None,
        }
    }

    fn weth() -> Address {
        WETH.contract_address.unwrap()
    }

    fn eth(value: u128) -> U256 {
        U256::from(value * 1_000_000_000_000_000_000u128)
    }

    #[test]
    fn test_weth_sale_through_seaport() {
        let amount = U256::from(1_500_000_000_000_000_000u128);
        let ctx = context(
            SEAPORT,
            vec![
                nft_log(LAND, SELLER, BUYER, 7),
                erc20_log(weth(), BUYER, SELLER, amount),
            ],
            U256::ZERO,
        );

        let sale = SaleAttributor::new(LAND).attribute(&raw(0xaa, 7), &ctx, None);

        assert_eq!(sale.kind, SaleKind::Sale);
        assert_eq!(sale.marketplace, Marketplace::OpenSea);
        assert_eq!(sale.currency_symbol(), Some("WETH"));
        assert_eq!(sale.consideration_amount(), Some(amount));
        assert_eq!(sale.price_display().as_deref(), Some("1.5"));
    }

    #[test]
    fn test_unknown_contract_is_a_plain_transfer() {
        let ctx = context(
            address!("9999999999999999999999999999999999999999"),
            vec![
                nft_log(LAND, SELLER, BUYER, 7),
                erc20_log(weth(), BUYER, SELLER, eth(1)),
            ],
            U256::ZERO,
        );

        let sale = SaleAttributor::new(LAND).attribute(&raw(0xaa, 7), &ctx, None);

        assert_eq!(sale.kind, SaleKind::Transfer);
        assert_eq!(sale.consideration, None);
        assert_eq!(sale.marketplace, Marketplace::Unknown);
    }

    #[test]
    fn test_zero_consideration_never_becomes_a_sale() {
        let ctx = context(SEAPORT, vec![nft_log(LAND, SELLER, BUYER, 7)], U256::ZERO);
        let attributor = SaleAttributor::new(LAND);

        for perspective in [None, Some(&BUYER), Some(&SELLER)] {
            let sale = attributor.attribute(&raw(0xaa, 7), &ctx, perspective);
            assert_eq!(sale.kind, SaleKind::Transfer);
            assert_eq!(sale.consideration, None);
        }
    }

    #[test]
    fn test_missing_collection_log_is_a_transfer() {
        let ctx = context(
            SEAPORT,
            vec![erc20_log(weth(), BUYER, SELLER, eth(1))],
            U256::ZERO,
        );
        let sale = SaleAttributor::new(LAND).attribute(&raw(0xaa, 7), &ctx, None);
        assert_eq!(sale.kind, SaleKind::Transfer);
    }

    #[test]
    fn test_attribution_is_deterministic() {
        let ctx = context(
            SEAPORT,
            vec![
                nft_log(LAND, SELLER, BUYER, 7),
                erc20_log(weth(), BUYER, SELLER, eth(2)),
            ],
            U256::ZERO,
        );
        let attributor = SaleAttributor::new(LAND);
        let first = attributor.attribute(&raw(0xaa, 7), &ctx, Some(&BUYER));
        let second = attributor.attribute(&raw(0xaa, 7), &ctx, Some(&BUYER));
        assert_eq!(first, second);
    }

    #[test]
    fn test_perspective_sets_direction() {
        let ctx = context(
            SEAPORT,
            vec![
                nft_log(LAND, SELLER, BUYER, 7),
                erc20_log(weth(), BUYER, SELLER, eth(1)),
            ],
            U256::ZERO,
        );
        let attributor = SaleAttributor::new(LAND);
        let stranger = address!("3333333333333333333333333333333333333333");

        assert_eq!(
            attributor.attribute(&raw(0xaa, 7), &ctx, Some(&BUYER)).kind,
            SaleKind::Bought
        );
        assert_eq!(
            attributor.attribute(&raw(0xaa, 7), &ctx, Some(&SELLER)).kind,
            SaleKind::Sold
        );
        assert_eq!(
            attributor.attribute(&raw(0xaa, 7), &ctx, Some(&stranger)).kind,
            SaleKind::Sale
        );
    }

    #[test]
    fn test_native_value_takes_the_label_and_absorbs_weth() {
        let ctx = context(
            SEAPORT,
            vec![
                nft_log(LAND, SELLER, BUYER, 7),
                erc20_log(weth(), BUYER, SELLER, eth(1)),
            ],
            eth(2),
        );
        let sale = SaleAttributor::new(LAND).attribute(&raw(0xaa, 7), &ctx, None);
        assert_eq!(sale.currency_symbol(), Some("ETH"));
        assert_eq!(sale.consideration_amount(), Some(eth(3)));
    }

    #[test]
    fn test_native_value_does_not_absorb_wild() {
        let ctx = context(
            WWMM_V2,
            vec![
                nft_log(LAND, SELLER, BUYER, 7),
                erc20_log(WILD.contract_address.unwrap(), BUYER, SELLER, eth(500)),
            ],
            eth(1),
        );
        let sale = SaleAttributor::new(LAND).attribute(&raw(0xaa, 7), &ctx, None);
        assert_eq!(sale.currency_symbol(), Some("ETH"));
        assert_eq!(sale.consideration_amount(), Some(eth(1)));
    }

    #[test]
    fn test_wwmm_settles_in_wild() {
        let ctx = context(
            WWMM_V2,
            vec![
                erc20_log(weth(), BUYER, SELLER, U256::from(5u64)),
                erc20_log(WILD.contract_address.unwrap(), BUYER, SELLER, eth(800)),
                nft_log(LAND, SELLER, BUYER, 42),
            ],
            U256::ZERO,
        );
        let sale = SaleAttributor::new(LAND).attribute(&raw(0xaa, 42), &ctx, None);
        assert_eq!(sale.marketplace, Marketplace::Wwmm);
        assert_eq!(sale.currency_symbol(), Some("WILD"));
        assert_eq!(sale.price_display().as_deref(), Some("800.0"));
    }

    #[test]
    fn test_bundle_consideration_is_split() {
        let ctx = context(
            SEAPORT,
            vec![
                nft_log(LAND, SELLER, BUYER, 10),
                nft_log(LAND, SELLER, BUYER, 11),
                erc20_log(weth(), BUYER, SELLER, U256::from(7u64)),
            ],
            U256::ZERO,
        );
        let attributor = SaleAttributor::new(LAND);
        let first = attributor.attribute(&raw(0xbb, 10), &ctx, None);
        let second = attributor.attribute(&raw(0xbb, 11), &ctx, None);

        assert_eq!(first.bundle_size, 2);
        assert_eq!(first.consideration_amount(), Some(U256::from(4u64)));
        assert_eq!(second.consideration_amount(), Some(U256::from(3u64)));
        assert_eq!(first.kind, SaleKind::Sale);
        assert_eq!(second.kind, SaleKind::Sale);
    }

    #[test]
    fn test_routed_purchase_is_bought_from_the_buyer_side() {
        let router = address!("C2c862322E9c97D6244a3506655DA95F05246Fd8");
        let ctx = context(
            router,
            vec![
                nft_log(LAND, SELLER, router, 7),
                nft_log(LAND, router, BUYER, 7),
                erc20_log(weth(), BUYER, SELLER, eth(1)),
            ],
            U256::ZERO,
        );
        let attributor = SaleAttributor::new(LAND);
        let mut to_buyer = raw(0xaa, 7);
        to_buyer.from_address = router;
        let mut to_router = raw(0xaa, 7);
        to_router.to_address = router;

        let bought = attributor.attribute(&to_buyer, &ctx, Some(&BUYER));
        assert_eq!(bought.kind, SaleKind::Bought);
        assert_eq!(bought.marketplace, Marketplace::Reservoir);
        assert_eq!(bought.from_address, SELLER);
        assert_eq!(bought.to_address, BUYER);
        assert_eq!(bought.bundle_size, 1);
        assert_eq!(bought.consideration_amount(), Some(eth(1)));

        assert_eq!(
            attributor.attribute(&to_router, &ctx, Some(&BUYER)).kind,
            SaleKind::Bought
        );
        assert_eq!(
            attributor.attribute(&to_router, &ctx, Some(&SELLER)).kind,
            SaleKind::Sold
        );
        assert_eq!(attributor.attribute(&to_buyer, &ctx, None).to_address, BUYER);
    }

    #[test]
    fn test_routed_hop_without_a_price_keeps_the_reported_leg() {
        let router = address!("9999999999999999999999999999999999999999");
        let ctx = context(
            router,
            vec![
                nft_log(LAND, SELLER, router, 7),
                nft_log(LAND, router, BUYER, 7),
            ],
            U256::ZERO,
        );
        let mut leg = raw(0xaa, 7);
        leg.from_address = router;

        let transfer = SaleAttributor::new(LAND).attribute(&leg, &ctx, None);
        assert_eq!(transfer.kind, SaleKind::Transfer);
        assert_eq!(transfer.from_address, router);
        assert_eq!(transfer.to_address, BUYER);
    }

    #[test]
    fn test_timestamp_falls_back_to_block() {
        let when = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let ctx = context(SEAPORT, vec![], U256::ZERO).with_block_timestamp(Some(when));
        let sale = SaleAttributor::new(LAND).attribute(&raw(0xaa, 7), &ctx, None);
        assert_eq!(sale.timestamp, Some(when));
    }

    #[test]
    fn test_sale_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SaleKind::Bought).unwrap(), "\"bought\"");
        assert_eq!(SaleKind::Sold.as_str(), "sold");
        assert!(!SaleKind::Transfer.is_sale());
    }
}
