pub mod amount;
pub mod attribution;
pub mod currency;
pub mod decoder;
pub mod marketplace;
pub mod metadata;
pub mod providers;
pub mod types;
pub mod volume;

pub use amount::{format_units, to_decimal};
pub use attribution::{AttributedSale, Consideration, SaleAttributor, SaleKind};
pub use currency::{CurrencyToken, ETH, WETH, WILD};
pub use decoder::{
    decode_transfer_logs, transfer_event_topic, CurrencyTransfer, DecodedTransferLogs, NftTransfer,
    TRANSFER_EVENT_SIGNATURE,
};
pub use marketplace::{Marketplace, MarketplaceContract, MarketplaceRegistry};
pub use metadata::{normalize_media_uri, TraitAttribute, TraitMetadata, UNKNOWN_TRAIT};
pub use providers::{
    ChainDataProvider, FiatPriceSource, ListingProvider, MetadataLookup, NameResolver, SalesQuery,
};
pub use types::*;
pub use volume::{VolumeAccumulator, VolumeStats, VolumeWindow, WindowLabel};

pub use alloy_primitives::{Address, Bytes, B256, U256};

use retry_utils::RetryableError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SaleError {
    #[error("{provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },
    #[error("{provider} rate limit exceeded")]
    RateLimited { provider: String },
    #[error("{provider} request timed out")]
    Timeout { provider: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Malformed provider data: {0}")]
    Malformed(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SaleError {
    /// How the retry layer should treat this failure
    pub fn retry_class(&self) -> RetryableError {
        match self {
            SaleError::ProviderUnavailable { .. } => RetryableError::ServerError,
            SaleError::RateLimited { .. } => RetryableError::RateLimit,
            SaleError::Timeout { .. } => RetryableError::Timeout,
            SaleError::NotFound(_) | SaleError::Malformed(_) | SaleError::Configuration(_) => {
                RetryableError::Other
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SaleError>;

/// Lowercase `0x`-prefixed hex, the form every provider and the rendering layer compare on
pub fn address_hex(address: &Address) -> String {
    format!("{:#x}", address)
}

/// Parse an address the way the providers send it (any case, `0x` prefix)
pub fn parse_address(value: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| SaleError::Malformed(format!("invalid address '{}': {}", value, e)))
}

/// Parse a token id given either as decimal or `0x` hex
pub fn parse_token_id(value: &str) -> Result<U256> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) if hex.is_empty() => Ok(U256::ZERO),
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(trimmed, 10),
    };
    parsed.map_err(|e| SaleError::Malformed(format!("invalid token id '{}': {}", value, e)))
}
