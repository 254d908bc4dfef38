use activity_service::{ActivityRecord, HoldingsSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: String) -> Self {
        Self {
            success: false,
            error,
            timestamp: Utc::now(),
        }
    }
}

/// Standard API success response; the payload's fields sit next to `success`
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub network: String,
    pub metadata_loaded: bool,
    pub opensea_enabled: bool,
    pub wwmm_enabled: bool,
}

/// Query (or JSON body) for the sales feeds
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub limit: Option<usize>,
    pub page_key: Option<String>,
    pub marketplace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VolumeQuery {
    pub marketplace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesFeedQuery {
    pub limit: Option<usize>,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingsQuery {
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataQuery {
    pub plot_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletActivityResponse {
    pub address: String,
    pub activity: Vec<ActivityRecord>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct HoldingsResponse {
    pub holdings: HoldingsSummary,
}

#[derive(Debug, Serialize)]
pub struct EnsResponse {
    pub name: String,
    pub address: String,
}
