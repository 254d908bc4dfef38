pub mod dataset;
pub mod index;
pub mod store;

pub use index::MetadataIndex;
pub use store::MetadataStore;

use sale_core::SaleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read metadata dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Metadata dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid metadata dataset: {0}")]
    InvalidDataset(String),
}

impl From<MetadataError> for SaleError {
    fn from(err: MetadataError) -> Self {
        SaleError::ProviderUnavailable {
            provider: "metadata".to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
