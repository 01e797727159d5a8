use crate::{
    api::{
        error::ApiError,
        response::{ApiResponse, with_total_count},
    },
    cache::CacheKey,
    db::{kline, mint, sync_range, trade},
    models::SyncStatus,
    state::AppState,
    validation::{
        validate_interval, validate_limit, validate_offset, validate_solana_address,
        validate_timestamp,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

// GET /mints/{mint}/trades query parameters
#[derive(Deserialize)]
pub struct PageQuery {
    offset: Option<String>,
    limit: Option<String>,
}

// GET /mints/{mint}/klines query parameters
#[derive(Deserialize)]
pub struct KlinesQuery {
    interval: String,
    start_time: String,
    end_time: String,
}

// GET /sync/ranges query parameters
#[derive(Deserialize)]
pub struct RangesQuery {
    status: Option<String>,
    offset: Option<String>,
    limit: Option<String>,
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/mints/{mint}", get(get_mint))
        .route("/mints/{mint}/trades", get(get_trades))
        .route("/mints/{mint}/klines", get(get_klines))
        .route("/sync/ranges", get(get_sync_ranges))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn get_mint(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Response, ApiError> {
    validate_solana_address(&address)?;

    let cache_key = CacheKey::mint(&address);
    if let Some(cached) = state.cache.mints.get(&cache_key).await {
        return Ok(ApiResponse { data: cached }.into_response());
    }

    let projection = mint::get_mint(&state.db_pool, &address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("mint {}", address)))?;

    state.cache.mints.insert(cache_key, projection.clone()).await;
    Ok(ApiResponse { data: projection }.into_response())
}

async fn get_trades(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<PageQuery>,
) -> Result<Response, ApiError> {
    validate_solana_address(&address)?;
    let offset = validate_offset(params.offset.as_deref())?;
    let limit = validate_limit(params.limit.as_deref())?;

    let cache_key = CacheKey::trades(&address, offset, limit);
    if let Some((trades, total_count)) = state.cache.trades.get(&cache_key).await {
        return Ok(with_total_count(trades, total_count));
    }

    info!(
        "Fetching trades for mint: {}, offset: {}, limit: {}",
        address, offset, limit
    );
    let (trades, total_count) = trade::get_trades(&state.db_pool, &address, offset, limit).await?;

    state
        .cache
        .trades
        .insert(cache_key, (trades.clone(), total_count))
        .await;
    Ok(with_total_count(trades, total_count))
}

async fn get_klines(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<KlinesQuery>,
) -> Result<Response, ApiError> {
    validate_solana_address(&address)?;
    let interval = validate_interval(&params.interval)?;
    let start_time = validate_timestamp("start_time", &params.start_time)?;
    let end_time = validate_timestamp("end_time", &params.end_time)?;

    if start_time >= end_time {
        return Err(ApiError::InvalidParameter(
            "start_time must be less than end_time".to_string(),
        ));
    }

    let cache_key = CacheKey::klines(&address, interval.as_str(), start_time, end_time);
    if let Some(cached) = state.cache.klines.get(&cache_key).await {
        return Ok(ApiResponse { data: cached }.into_response());
    }

    let klines = kline::get_klines(&state.db_pool, &address, interval, start_time, end_time).await?;

    state.cache.klines.insert(cache_key, klines.clone()).await;
    Ok(ApiResponse { data: klines }.into_response())
}

// Not cached: operators poll this to watch workers make progress.
async fn get_sync_ranges(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangesQuery>,
) -> Result<Response, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<SyncStatus>)
        .transpose()
        .map_err(ApiError::InvalidParameter)?;
    let offset = validate_offset(params.offset.as_deref())?;
    let limit = validate_limit(params.limit.as_deref())?;

    let (ranges, total_count) = sync_range::list_ranges(&state.db_pool, status, offset, limit).await?;
    Ok(with_total_count(ranges, total_count))
}
