#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use activity_service::{NameLookup, RecordEnricher, ServiceSettings};
use alloy_primitives::{address, Address, Bytes, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sale_core::{
    transfer_event_topic, ChainDataProvider, FiatPriceSource, LogEntry, MetadataLookup,
    NameResolver, OwnedToken, RawTransfer, Result, SaleError, TraitAttribute, TraitMetadata,
    TransactionInfo, TransactionReceipt, TransferPage, TransferQuery,
};

pub const LAND: Address = address!("d396ca541F501F5D303166C509e2045848df356b");
pub const SEAPORT: Address = address!("00000000000000ADc04C56Bf30aC9d3c0aAF14dC");
pub const WWMM_V2: Address = address!("5ebc127fae83ed5bdd91fc6a5f5767E259dF5642");
pub const UNRELATED: Address = address!("9999999999999999999999999999999999999999");
pub const WETH_ADDRESS: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const WILD_ADDRESS: Address = address!("2a3bFF78B79A009976EeA096a51A948a3dC00e34");
pub const SELLER: Address = address!("1111111111111111111111111111111111111111");
pub const BUYER: Address = address!("2222222222222222222222222222222222222222");

pub fn hash(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

pub fn eth(value: u128) -> U256 {
    U256::from(value * 1_000_000_000_000_000_000u128)
}

fn address_topic(address: Address) -> B256 {
    B256::left_padding_from(address.as_slice())
}

pub fn nft_log(from: Address, to: Address, token_id: u64) -> LogEntry {
    LogEntry {
        address: LAND,
        topics: vec![
            transfer_event_topic(),
            address_topic(from),
            address_topic(to),
            B256::from(U256::from(token_id).to_be_bytes::<32>()),
        ],
        data: Bytes::new(),
    }
}

pub fn erc20_log(token: Address, from: Address, to: Address, amount: U256) -> LogEntry {
    LogEntry {
        address: token,
        topics: vec![transfer_event_topic(), address_topic(from), address_topic(to)],
        data: Bytes::from(amount.to_be_bytes::<32>().to_vec()),
    }
}

pub fn transfer(
    hash_byte: u8,
    token_id: u64,
    from: Address,
    to: Address,
    at: Option<DateTime<Utc>>,
    block: u64,
) -> RawTransfer {
    RawTransfer {
        transaction_hash: hash(hash_byte),
        token_id: U256::from(token_id),
        from_address: from,
        to_address: to,
        block_timestamp: at,
        block_number: block,
    }
}

/// Settings without pacing delays
pub fn test_settings() -> ServiceSettings {
    let mut settings = ServiceSettings::new(LAND);
    settings.batch_delay_ms = 0;
    settings.page_delay_ms = 0;
    settings.ens_timeout = Duration::from_millis(200);
    settings
}

struct StoredTransaction {
    receipt: TransactionReceipt,
    info: TransactionInfo,
}

/// In-memory chain with per-call counters
#[derive(Default)]
pub struct MockChain {
    pages: HashMap<Option<String>, TransferPage>,
    wallet_transfers: Vec<RawTransfer>,
    transactions: HashMap<B256, StoredTransaction>,
    failing: HashSet<B256>,
    delays: HashMap<B256, u64>,
    block_timestamps: HashMap<u64, DateTime<Utc>>,
    owned: Vec<OwnedToken>,
    transfers_fail: bool,
    pub transfer_calls: AtomicUsize,
    pub block_calls: AtomicUsize,
    pub requested_page_keys: Mutex<Vec<Option<String>>>,
    receipt_calls: Mutex<HashMap<B256, usize>>,
    transaction_calls: Mutex<HashMap<B256, usize>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(
        mut self,
        key: Option<&str>,
        transfers: Vec<RawTransfer>,
        next: Option<&str>,
    ) -> Self {
        self.pages.insert(
            key.map(str::to_string),
            TransferPage {
                transfers,
                page_key: next.map(str::to_string),
            },
        );
        self
    }

    pub fn with_wallet_transfers(mut self, transfers: Vec<RawTransfer>) -> Self {
        self.wallet_transfers = transfers;
        self
    }

    pub fn with_transaction(
        mut self,
        hash_byte: u8,
        to: Address,
        logs: Vec<LogEntry>,
        value: U256,
    ) -> Self {
        let transaction_hash = hash(hash_byte);
        self.transactions.insert(
            transaction_hash,
            StoredTransaction {
                receipt: TransactionReceipt {
                    transaction_hash,
                    to: Some(to),
                    logs,
                },
                info: TransactionInfo {
                    transaction_hash,
                    value,
                    block_number: Some(100),
                },
            },
        );
        self
    }

    /// WETH sale of one token through Seaport
    pub fn with_weth_sale(
        self,
        hash_byte: u8,
        token_id: u64,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Self {
        self.with_transaction(
            hash_byte,
            SEAPORT,
            vec![
                nft_log(from, to, token_id),
                erc20_log(WETH_ADDRESS, to, from, amount),
            ],
            U256::ZERO,
        )
    }

    pub fn failing_receipt(mut self, hash_byte: u8) -> Self {
        self.failing.insert(hash(hash_byte));
        self
    }

    pub fn delayed(mut self, hash_byte: u8, millis: u64) -> Self {
        self.delays.insert(hash(hash_byte), millis);
        self
    }

    pub fn with_block_timestamp(mut self, block: u64, at: DateTime<Utc>) -> Self {
        self.block_timestamps.insert(block, at);
        self
    }

    pub fn with_owned(mut self, owned: Vec<OwnedToken>) -> Self {
        self.owned = owned;
        self
    }

    pub fn failing_transfers(mut self) -> Self {
        self.transfers_fail = true;
        self
    }

    pub fn receipt_calls(&self, hash_byte: u8) -> usize {
        self.receipt_calls
            .lock()
            .unwrap()
            .get(&hash(hash_byte))
            .copied()
            .unwrap_or(0)
    }

    pub fn transaction_calls(&self, hash_byte: u8) -> usize {
        self.transaction_calls
            .lock()
            .unwrap()
            .get(&hash(hash_byte))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_receipt_calls(&self) -> usize {
        self.receipt_calls.lock().unwrap().values().sum()
    }
}

fn unavailable() -> SaleError {
    SaleError::ProviderUnavailable {
        provider: "mock".to_string(),
        message: "connection reset".to_string(),
    }
}

#[async_trait]
impl ChainDataProvider for MockChain {
    async fn get_asset_transfers(&self, query: &TransferQuery) -> Result<TransferPage> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_page_keys
            .lock()
            .unwrap()
            .push(query.page_key.clone());
        if self.transfers_fail {
            return Err(unavailable());
        }

        if query.from_address.is_some() || query.to_address.is_some() {
            let transfers = self
                .wallet_transfers
                .iter()
                .filter(|t| query.from_address.map_or(true, |a| t.from_address == a))
                .filter(|t| query.to_address.map_or(true, |a| t.to_address == a))
                .cloned()
                .collect();
            return Ok(TransferPage {
                transfers,
                page_key: None,
            });
        }

        self.pages
            .get(&query.page_key)
            .cloned()
            .ok_or_else(|| SaleError::NotFound(format!("page {:?}", query.page_key)))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        *self.receipt_calls.lock().unwrap().entry(hash).or_insert(0) += 1;
        if let Some(millis) = self.delays.get(&hash) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        if self.failing.contains(&hash) {
            return Err(unavailable());
        }
        Ok(self.transactions.get(&hash).map(|t| t.receipt.clone()))
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionInfo>> {
        *self.transaction_calls.lock().unwrap().entry(hash).or_insert(0) += 1;
        Ok(self.transactions.get(&hash).map(|t| t.info.clone()))
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<Option<DateTime<Utc>>> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.block_timestamps.get(&block_number).copied())
    }

    async fn get_owned_tokens(
        &self,
        _owner: Address,
        contract: Address,
    ) -> Result<Vec<OwnedToken>> {
        if contract != LAND {
            return Ok(Vec::new());
        }
        Ok(self.owned.clone())
    }
}

pub fn plot(token_id: &str, neighborhood: &str, zoning: &str) -> TraitMetadata {
    let attr = |t: &str, v: &str| TraitAttribute {
        trait_type: t.to_string(),
        value: v.to_string(),
    };
    TraitMetadata::from_attributes(
        Some(token_id.to_string()),
        None,
        format!("{} {}", neighborhood, token_id),
        vec![attr("Neighborhood", neighborhood), attr("Zoning Type", zoning)],
        None,
        None,
    )
}

#[derive(Default)]
pub struct MockMetadata {
    plots: HashMap<String, TraitMetadata>,
}

impl MockMetadata {
    pub fn with(mut self, metadata: TraitMetadata) -> Self {
        if let Some(id) = metadata.token_id.clone() {
            self.plots.insert(id, metadata);
        }
        self
    }
}

#[async_trait]
impl MetadataLookup for MockMetadata {
    async fn get_metadata_for_token(&self, token_id: &str) -> Result<Option<TraitMetadata>> {
        Ok(self.plots.get(token_id).cloned())
    }
}

#[derive(Default)]
pub struct MockNames {
    names: HashMap<Address, String>,
}

impl MockNames {
    pub fn with(mut self, address: Address, name: &str) -> Self {
        self.names.insert(address, name.to_string());
        self
    }
}

#[async_trait]
impl NameResolver for MockNames {
    async fn lookup_address(&self, address: Address) -> Result<Option<String>> {
        Ok(self.names.get(&address).cloned())
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        Ok(self
            .names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(a, _)| *a))
    }
}

/// Fixed price, or a failing source when `None`
pub struct MockPrices(pub Option<Decimal>);

#[async_trait]
impl FiatPriceSource for MockPrices {
    async fn get_unit_price_in_fiat(&self, _token_contract: Address) -> Result<Option<Decimal>> {
        match self.0 {
            Some(price) => Ok(Some(price)),
            None => Err(unavailable()),
        }
    }
}

pub fn enricher(metadata: MockMetadata, names: MockNames) -> RecordEnricher {
    RecordEnricher::new(
        Arc::new(metadata),
        NameLookup::new(Some(Arc::new(names)), Duration::from_millis(200)),
    )
}
