//! Admin catalog endpoints. Role enforcement happens upstream; these handlers
//! trust the caller.

use crate::api::{ApiResponse, AppState};
use crate::db::repo::is_unique_violation;
use crate::domain::{Asset, Pool, PoolAddress, PriceFeeds, Symbol, TimeMs};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price_feeds: PriceFeeds,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    pub price_feeds: Option<PriceFeeds>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolRequest {
    pub pool_address: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePoolRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

pub async fn create_asset(
    State(state): State<AppState>,
    Json(req): Json<CreateAssetRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Asset>>), AppError> {
    if req.symbol.trim().is_empty() {
        return Err(AppError::Validation("symbol must not be empty".into()));
    }
    if req.price_feeds.is_empty() {
        return Err(AppError::Validation(
            "at least one price feed id is required".into(),
        ));
    }

    let asset = Asset {
        symbol: Symbol::new(req.symbol),
        name: req.name,
        image: req.image,
        price_feeds: req.price_feeds,
        created_at: TimeMs::now(),
    };

    state.repo.insert_asset(&asset).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Asset {} already exists", asset.symbol))
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, ApiResponse::ok("Asset created", asset)))
}

pub async fn update_asset(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(req): Json<UpdateAssetRequest>,
) -> Result<Json<ApiResponse<Asset>>, AppError> {
    let symbol = Symbol::new(symbol);
    let mut asset = state
        .repo
        .get_asset(&symbol)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asset {} not found", symbol)))?;

    if let Some(name) = req.name {
        asset.name = name;
    }
    if let Some(image) = req.image {
        asset.image = image;
    }
    if let Some(price_feeds) = req.price_feeds {
        if price_feeds.is_empty() {
            return Err(AppError::Validation(
                "at least one price feed id is required".into(),
            ));
        }
        asset.price_feeds = price_feeds;
    }

    if !state.repo.update_asset(&asset).await? {
        return Err(AppError::NotFound(format!("Asset {} not found", symbol)));
    }

    Ok(ApiResponse::ok("Asset updated", asset))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let symbol = Symbol::new(symbol);
    if !state.repo.delete_asset(&symbol).await? {
        return Err(AppError::NotFound(format!("Asset {} not found", symbol)));
    }
    Ok(ApiResponse::ok("Asset deleted", serde_json::Value::Null))
}

pub async fn create_pool(
    State(state): State<AppState>,
    Json(req): Json<CreatePoolRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Pool>>), AppError> {
    if req.pool_address.trim().is_empty() {
        return Err(AppError::Validation("poolAddress must not be empty".into()));
    }

    let pool = Pool {
        pool_address: PoolAddress::new(req.pool_address),
        name: req.name,
        description: req.description,
        image: req.image,
        created_at: TimeMs::now(),
    };

    state.repo.insert_pool(&pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Pool {} already exists", pool.pool_address))
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, ApiResponse::ok("Pool created", pool)))
}

pub async fn update_pool(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<UpdatePoolRequest>,
) -> Result<Json<ApiResponse<Pool>>, AppError> {
    let address = PoolAddress::new(address);
    let mut pool = state
        .repo
        .get_pool(&address)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pool {} not found", address)))?;

    if let Some(name) = req.name {
        pool.name = name;
    }
    if let Some(description) = req.description {
        pool.description = description;
    }
    if let Some(image) = req.image {
        pool.image = image;
    }

    if !state.repo.update_pool(&pool).await? {
        return Err(AppError::NotFound(format!("Pool {} not found", address)));
    }

    Ok(ApiResponse::ok("Pool updated", pool))
}

pub async fn delete_pool(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let address = PoolAddress::new(address);
    if !state.repo.delete_pool(&address).await? {
        return Err(AppError::NotFound(format!("Pool {} not found", address)));
    }
    Ok(ApiResponse::ok("Pool deleted", serde_json::Value::Null))
}
