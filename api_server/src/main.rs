use activity_service::{
    ActivityAggregator, MarketAggregator, NameLookup, RecordEnricher, ServiceError,
    ServiceSettings, VolumeStatsAggregator, WalletAnalytics,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chain_client::{AlchemyClient, AlchemyClientConfig};
use config_manager::{ConfigurationError, SystemConfig};
use market_client::{
    CoinGeckoClient, CoinGeckoClientConfig, OpenSeaClient, OpenSeaClientConfig, ReservoirClient,
    ReservoirClientConfig,
};
use metadata_store::{MetadataError, MetadataStore};
use retry_utils::RetryConfig;
use sale_core::{FiatPriceSource, ListingProvider, Marketplace, SaleAttributor, SaleError};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

mod handlers;
mod types;

use handlers::*;
use types::*;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SystemConfig>,
    pub activity: Arc<ActivityAggregator>,
    pub volume: Arc<VolumeStatsAggregator>,
    pub wallets: Arc<WalletAnalytics>,
    pub market: Arc<MarketAggregator>,
    pub metadata: Arc<MetadataStore>,
    pub names: NameLookup,
    pub started_at: Instant,
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),
    #[error("{0}")]
    Service(#[from] ServiceError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Config(_) | ApiError::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(e) => match e {
                ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::Provider(SaleError::NotFound(_)) => StatusCode::NOT_FOUND,
                ServiceError::Provider(SaleError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
                ServiceError::Provider(SaleError::Configuration(_)) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ServiceError::Provider(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }

        let body = Json(ErrorResponse::new(self.to_string()));
        (status, body).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,api_server=debug,activity_service=debug".into()),
        )
        .init();

    info!("Starting plot market API server...");

    // Load configuration
    let config = SystemConfig::load()?;
    config.validate()?;
    info!("Configuration loaded successfully");

    let app_state = build_state(config.clone())?;

    // Warm the metadata index; requests retry the load if this fails
    if let Err(e) = app_state.metadata.initialize().await {
        warn!("Metadata dataset not loaded at startup: {}", e);
    }

    let app = create_router(app_state);

    info!("📋 Available endpoints:");
    info!("   • GET  /health");
    info!("   • GET|POST /api/activity, GET /api/wwmm/activity");
    info!("   • GET  /api/volume, GET /api/wwmm/volume");
    info!("   • GET  /api/opensea/sales");
    info!("   • GET  /api/wallets/:address/activity, GET /api/wallets/:address/holdings");
    info!("   • GET  /api/listings/opensea, GET /api/listings/wwmm");
    info!("   • GET  /api/metadata/:token_id, GET /api/metadata?plotName=");
    info!("   • GET  /api/ens/:name");

    // Bind and serve
    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the provider clients and aggregators from configuration. Missing required
/// credentials fail here, before the server binds.
fn build_state(config: SystemConfig) -> anyhow::Result<AppState> {
    let retry = RetryConfig {
        max_attempts: config.retry.max_attempts,
        base_delay_ms: config.retry.base_delay_ms,
        max_delay_ms: config.retry.max_delay_ms,
    };
    let settings = ServiceSettings::from_config(&config)?;

    let alchemy = Arc::new(AlchemyClient::new(AlchemyClientConfig {
        timeout_seconds: config.alchemy.request_timeout_seconds,
        retry: retry.clone(),
        ..AlchemyClientConfig::new(&config.alchemy.api_key, &config.alchemy.network)
    })?);
    info!("Alchemy client ready ({})", config.alchemy.network);

    let prices: Arc<dyn FiatPriceSource> = Arc::new(CoinGeckoClient::new(CoinGeckoClientConfig {
        base_url: config.coingecko.api_base_url.clone(),
        vs_currency: config.coingecko.vs_currency.clone(),
        timeout_seconds: config.coingecko.request_timeout_seconds,
        retry: retry.clone(),
    })?);

    let mut venues: Vec<Arc<dyn ListingProvider>> = Vec::new();
    if config.opensea.enabled {
        venues.push(Arc::new(OpenSeaClient::new(OpenSeaClientConfig {
            api_key: config.opensea.api_key.clone(),
            base_url: config.opensea.api_base_url.clone(),
            collection_slug: config.opensea.collection_slug.clone(),
            timeout_seconds: config.opensea.request_timeout_seconds,
            max_listings: config.opensea.max_listings,
            retry: retry.clone(),
            ..OpenSeaClientConfig::default()
        })?));
        info!("OpenSea feed enabled for {}", config.opensea.collection_slug);
    }
    if config.reservoir.enabled {
        venues.push(Arc::new(ReservoirClient::new(ReservoirClientConfig {
            base_url: config.reservoir.api_base_url.clone(),
            timeout_seconds: config.reservoir.request_timeout_seconds,
            max_listings: config.reservoir.max_listings,
            page_delay_ms: config.reservoir.page_delay_ms,
            retry: retry.clone(),
            ..ReservoirClientConfig::new(&config.reservoir.api_key, settings.collection)
        })?));
        info!("{} feed enabled via Reservoir", Marketplace::Wwmm);
    }

    let metadata = Arc::new(MetadataStore::new(&config.metadata.path));
    let names = NameLookup::new(Some(alchemy.clone()), settings.ens_timeout);
    let enricher = RecordEnricher::new(metadata.clone(), names.clone());
    let attributor = Arc::new(
        SaleAttributor::new(settings.collection).with_currencies(settings.currencies.clone()),
    );

    Ok(AppState {
        activity: Arc::new(ActivityAggregator::new(
            alchemy.clone(),
            attributor.clone(),
            enricher.clone(),
            settings.clone(),
        )),
        volume: Arc::new(VolumeStatsAggregator::new(
            alchemy.clone(),
            attributor.clone(),
            Some(prices),
            settings.clone(),
        )),
        wallets: Arc::new(WalletAnalytics::new(
            alchemy,
            attributor,
            enricher.clone(),
            settings.clone(),
        )),
        market: Arc::new(MarketAggregator::new(venues, enricher, settings)),
        metadata,
        names,
        config: Arc::new(config),
        started_at: Instant::now(),
    })
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Sales feeds
        .route("/api/activity", get(get_activity).post(post_activity))
        .route("/api/wwmm/activity", get(get_wwmm_activity))
        .route("/api/opensea/sales", get(get_opensea_sales))
        // Volume
        .route("/api/volume", get(get_volume))
        .route("/api/wwmm/volume", get(get_wwmm_volume))
        // Wallets
        .route("/api/wallets/:address/activity", get(get_wallet_activity))
        .route("/api/wallets/:address/holdings", get(get_wallet_holdings))
        // Listings
        .route("/api/listings/opensea", get(get_opensea_listings))
        .route("/api/listings/wwmm", get(get_wwmm_listings))
        // Metadata and names
        .route("/api/metadata", get(get_metadata_by_name))
        .route("/api/metadata/:token_id", get(get_metadata_by_token))
        .route("/api/ens/:name", get(resolve_ens))
        // Add CORS middleware
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}
