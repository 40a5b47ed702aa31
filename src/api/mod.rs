pub mod catalog;
pub mod health;
pub mod holdings;
pub mod investment;
pub mod transactions;
pub mod users;
pub mod wallets;

use crate::config::Config;
use crate::db::Repository;
use crate::engine::LedgerWriter;
use crate::oracle::Oracle;
use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub ledger: Arc<LedgerWriter>,
    pub oracle: Arc<Oracle>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        ledger: Arc<LedgerWriter>,
        oracle: Arc<Oracle>,
    ) -> Self {
        Self {
            repo,
            config,
            ledger,
            oracle,
        }
    }
}

/// Success envelope: `{ "message": ..., "payload": ..., "success": true }`.
/// Failures go through `AppError::into_response` instead.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub payload: T,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Json<Self> {
        Json(Self {
            message: message.into(),
            payload,
            success: true,
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/v1/users", post(users::create_user))
        .route(
            "/v1/users/:id",
            get(users::get_user).put(users::update_user),
        )
        .route(
            "/v1/users/:id/kyc",
            post(users::submit_kyc)
                .get(users::get_kyc)
                .put(users::update_kyc),
        )
        .route(
            "/v1/wallets",
            post(wallets::register_wallet).get(wallets::list_wallets),
        )
        .route("/v1/wallets/:id/reconcile", post(wallets::reconcile_wallet))
        .route("/v1/assets", post(catalog::create_asset))
        .route(
            "/v1/assets/:symbol",
            put(catalog::update_asset).delete(catalog::delete_asset),
        )
        .route("/v1/pools", post(catalog::create_pool))
        .route(
            "/v1/pools/:address",
            put(catalog::update_pool).delete(catalog::delete_pool),
        )
        .route(
            "/v1/transactions",
            post(transactions::apply_transaction).get(transactions::list_transactions),
        )
        .route("/v1/holdings", get(holdings::get_holdings))
        .route("/v1/investments/total", get(investment::get_total_investment))
        .layer(cors)
        .with_state(state)
}
