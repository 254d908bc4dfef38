use std::time::Duration;

use alloy_primitives::Address;
use config_manager::SystemConfig;
use sale_core::{parse_address, CurrencyToken, WETH, WILD};

use crate::{Result, ServiceError};

/// Alchemy rejects `maxCount` above 1000
const MAX_TRANSFER_PAGE: u32 = 1000;

/// Knobs shared by every aggregator
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub collection: Address,
    /// ERC-20 settlement currencies, in preference order
    pub currencies: Vec<CurrencyToken>,
    /// Transfers requested per activity page
    pub page_size: u32,
    /// Transfers requested per volume page
    pub volume_page_size: u32,
    pub default_limit: usize,
    pub max_limit: usize,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub page_delay_ms: u64,
    pub ens_timeout: Duration,
    pub volume_lookback: chrono::Duration,
    pub max_volume_pages: usize,
}

impl ServiceSettings {
    pub fn new(collection: Address) -> Self {
        Self {
            collection,
            currencies: CurrencyToken::wrapped_defaults(),
            page_size: 50,
            volume_page_size: 200,
            default_limit: 25,
            max_limit: 100,
            batch_size: 10,
            batch_delay_ms: 200,
            page_delay_ms: 100,
            ens_timeout: Duration::from_millis(5000),
            volume_lookback: chrono::Duration::days(7),
            max_volume_pages: 20,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Result<Self> {
        let parse = |field: &str, value: &str| {
            parse_address(value)
                .map_err(|e| ServiceError::Config(format!("collection.{}: {}", field, e)))
        };
        let collection = parse("contract_address", &config.collection.contract_address)?;
        let weth = parse("weth_address", &config.collection.weth_address)?;
        let wild = parse("wild_address", &config.collection.wild_address)?;

        let activity = &config.activity;
        Ok(Self {
            collection,
            currencies: vec![
                CurrencyToken {
                    contract_address: Some(weth),
                    ..WETH
                },
                CurrencyToken {
                    contract_address: Some(wild),
                    ..WILD
                },
            ],
            page_size: config.alchemy.page_size,
            volume_page_size: config.alchemy.max_count_volume,
            default_limit: activity.default_limit,
            max_limit: activity.max_limit,
            batch_size: activity.batch_size,
            batch_delay_ms: activity.batch_delay_ms,
            page_delay_ms: activity.page_delay_ms,
            ens_timeout: Duration::from_millis(activity.ens_timeout_ms),
            volume_lookback: chrono::Duration::days(activity.volume_lookback_days),
            max_volume_pages: activity.max_volume_pages,
        })
    }

    /// Requested record count, defaulted and clamped to `1..=max_limit`
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }

    /// Transfers to ask for so that `limit` sales can usually be filled from one page
    pub fn transfer_page_size(&self, limit: usize) -> u32 {
        let limit = u32::try_from(limit).unwrap_or(MAX_TRANSFER_PAGE);
        self.page_size.max(limit).clamp(1, MAX_TRANSFER_PAGE)
    }

    pub fn volume_transfer_page_size(&self) -> u32 {
        self.volume_page_size.clamp(1, MAX_TRANSFER_PAGE)
    }
}
