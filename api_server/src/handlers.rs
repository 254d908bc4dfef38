use crate::types::*;
use crate::{ApiError, AppState};
use activity_service::ActivityRequest;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use sale_core::{address_hex, parse_address, Marketplace};
use tracing::{debug, info};

fn parse_marketplace(value: Option<&str>) -> Result<Option<Marketplace>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all")) {
        None => Ok(None),
        Some(name) => Marketplace::from_str(name)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown marketplace '{}'", name))),
    }
}

fn parse_wallet(address: &str) -> Result<sale_core::Address, ApiError> {
    parse_address(address)
        .map_err(|_| ApiError::BadRequest(format!("Invalid wallet address '{}'", address)))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(SuccessResponse::new(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        network: state.config.alchemy.network.clone(),
        metadata_loaded: state.metadata.is_initialized(),
        opensea_enabled: state.market.has_provider(Marketplace::OpenSea),
        wwmm_enabled: state.market.has_provider(Marketplace::Wwmm),
    }))
}

async fn activity_page(
    state: &AppState,
    query: ActivityQuery,
    forced: Option<Marketplace>,
) -> Result<impl IntoResponse, ApiError> {
    let marketplace = match forced {
        Some(m) => Some(m),
        None => parse_marketplace(query.marketplace.as_deref())?,
    };
    debug!(
        "Activity request: limit={:?} pageKey={:?} marketplace={:?}",
        query.limit, query.page_key, marketplace
    );

    let page = state
        .activity
        .get_recent_activity(ActivityRequest {
            limit: query.limit,
            page_key: query.page_key,
            marketplace,
        })
        .await?;
    Ok(Json(SuccessResponse::new(page)))
}

/// Recent sales across every venue
pub async fn get_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    activity_page(&state, query, None).await
}

/// Same as [`get_activity`] with the parameters in a JSON body
pub async fn post_activity(
    State(state): State<AppState>,
    body: Option<Json<ActivityQuery>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = body.map(|Json(q)| q).unwrap_or_default();
    activity_page(&state, query, None).await
}

pub async fn get_wwmm_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    activity_page(&state, query, Some(Marketplace::Wwmm)).await
}

pub async fn get_volume(
    State(state): State<AppState>,
    Query(query): Query<VolumeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let marketplace = parse_marketplace(query.marketplace.as_deref())?;
    let stats = state.volume.get_volume_stats(marketplace).await?;
    Ok(Json(SuccessResponse::new(stats)))
}

pub async fn get_wwmm_volume(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.volume.get_volume_stats(Some(Marketplace::Wwmm)).await?;
    Ok(Json(SuccessResponse::new(stats)))
}

/// Sale events as reported by OpenSea
pub async fn get_opensea_sales(
    State(state): State<AppState>,
    Query(query): Query<SalesFeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .market
        .get_market_sales(Marketplace::OpenSea, query.limit, query.next)
        .await?;
    Ok(Json(SuccessResponse::new(page)))
}

pub async fn get_wallet_activity(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let wallet = parse_wallet(&address)?;
    let activity = state.wallets.get_wallet_activity(wallet, query.limit).await?;
    Ok(Json(SuccessResponse::new(WalletActivityResponse {
        address: address_hex(&wallet),
        total_count: activity.len(),
        activity,
    })))
}

pub async fn get_wallet_holdings(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let wallet = parse_wallet(&address)?;
    let holdings = state.wallets.get_holdings(wallet).await?;
    Ok(Json(SuccessResponse::new(HoldingsResponse { holdings })))
}

async fn listings(
    state: &AppState,
    marketplace: Marketplace,
    query: ListingsQuery,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.market.get_listings(marketplace, query.cursor).await?;
    info!("Serving {} {} listings", page.total_count, marketplace);
    Ok(Json(SuccessResponse::new(page)))
}

pub async fn get_opensea_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    listings(&state, Marketplace::OpenSea, query).await
}

pub async fn get_wwmm_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    listings(&state, Marketplace::Wwmm, query).await
}

pub async fn get_metadata_by_token(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let metadata = state
        .metadata
        .get(&token_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No metadata for token {}", token_id)))?;
    Ok(Json(SuccessResponse::new(metadata)))
}

pub async fn get_metadata_by_name(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let name = query
        .plot_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("plotName is required".to_string()))?;
    let metadata = state
        .metadata
        .get_by_name(&name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No plot named '{}'", name)))?;
    Ok(Json(SuccessResponse::new(metadata)))
}

pub async fn resolve_ens(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let address = state
        .names
        .resolve(&name)
        .await
        .map_err(activity_service::ServiceError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("{} does not resolve", name)))?;
    Ok(Json(SuccessResponse::new(EnsResponse {
        name,
        address: address_hex(&address),
    })))
}
