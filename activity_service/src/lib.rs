//! Request-scoped aggregation over the chain, marketplace, metadata and price collaborators.
//!
//! Every aggregator is stateless between calls: cursors come in with the request and go
//! back out with the response.

pub mod activity;
pub mod context;
pub mod enrich;
pub mod market;
pub mod names;
pub mod records;
pub mod settings;
pub mod volume;
pub mod wallet;

pub use activity::{ActivityAggregator, ActivityRequest};
pub use context::{unique_hashes, ContextFetcher, ContextRequest};
pub use enrich::RecordEnricher;
pub use market::MarketAggregator;
pub use names::NameLookup;
pub use records::{
    ActivityKind, ActivityPage, ActivityRecord, HeldPlot, HoldingsSummary, ListingCard,
    ListingsPage,
};
pub use settings::ServiceSettings;
pub use volume::VolumeStatsAggregator;
pub use wallet::WalletAnalytics;

use config_manager::ConfigurationError;
use sale_core::SaleError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("Provider error: {0}")]
    Provider(#[from] SaleError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("No {0} provider configured")]
    NotConfigured(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ConfigurationError> for ServiceError {
    fn from(err: ConfigurationError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
