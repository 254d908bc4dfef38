use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::Marketplace;

/// One ERC-721 transfer of the tracked collection as reported by the blockchain data provider.
/// Keyed by `transaction_hash` + `token_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransfer {
    pub transaction_hash: B256,
    pub token_id: U256,
    pub from_address: Address,
    pub to_address: Address,
    /// Present when the provider was asked for transfer metadata
    pub block_timestamp: Option<DateTime<Utc>>,
    pub block_number: u64,
}

impl RawTransfer {
    pub fn is_mint(&self) -> bool {
        self.from_address == Address::ZERO
    }
}

/// A receipt log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// `getTransactionReceipt` projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    /// Called contract; `None` for contract creation
    pub to: Option<Address>,
    pub logs: Vec<LogEntry>,
}

/// `getTransaction` projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub transaction_hash: B256,
    /// Native value in wei
    pub value: U256,
    pub block_number: Option<u64>,
}

/// Everything attribution needs about one transaction, fetched once per unique hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub transaction_hash: B256,
    pub to_address: Option<Address>,
    pub logs: Vec<LogEntry>,
    pub native_value: U256,
    pub block_number: Option<u64>,
    pub block_timestamp: Option<DateTime<Utc>>,
}

impl TransactionContext {
    pub fn from_parts(receipt: TransactionReceipt, transaction: TransactionInfo) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            to_address: receipt.to,
            logs: receipt.logs,
            native_value: transaction.value,
            block_number: transaction.block_number,
            block_timestamp: None,
        }
    }

    pub fn with_block_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.block_timestamp = timestamp;
        self
    }
}

/// Sort order for transfer queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferOrder {
    #[default]
    Desc,
    Asc,
}

/// Filter for `getAssetTransfers`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferQuery {
    pub contract_address: Address,
    pub from_address: Option<Address>,
    pub to_address: Option<Address>,
    pub max_count: u32,
    pub page_key: Option<String>,
    pub order: TransferOrder,
}

impl TransferQuery {
    pub fn collection(contract_address: Address, max_count: u32) -> Self {
        Self {
            contract_address,
            max_count,
            ..Default::default()
        }
    }

    pub fn with_page_key(mut self, page_key: Option<String>) -> Self {
        self.page_key = page_key;
        self
    }
}

/// One page of provider transfers plus its opaque continuation cursor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferPage {
    pub transfers: Vec<RawTransfer>,
    pub page_key: Option<String>,
}

/// A collection token currently held by an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedToken {
    pub token_id: U256,
    pub name: Option<String>,
}

/// Active listing as normalized from either listing provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub order_id: String,
    pub token_id: U256,
    pub marketplace: Marketplace,
    pub maker: Option<Address>,
    /// Price in the currency's smallest unit
    pub price_amount: U256,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One page of listings and its continuation cursor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    pub next_cursor: Option<String>,
}

/// A sale as reported directly by a marketplace API (no log decoding involved)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSale {
    pub token_id: U256,
    pub name: Option<String>,
    pub seller: Option<Address>,
    pub buyer: Option<Address>,
    pub price_amount: U256,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub timestamp: DateTime<Utc>,
    pub transaction_hash: Option<B256>,
    pub marketplace: Marketplace,
}

/// One page of marketplace sales
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketSalePage {
    pub sales: Vec<MarketSale>,
    pub continuation: Option<String>,
}
