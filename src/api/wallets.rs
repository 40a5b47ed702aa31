use crate::api::{ApiResponse, AppState};
use crate::db::repo::is_unique_violation;
use crate::domain::{Position, UserId, Wallet, WalletId, WalletKind};
use crate::engine::{rebuild_wallet_totals, ReconcileOutcome};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWalletRequest {
    pub user_id: String,
    pub address: String,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWalletsQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub target_kind: String,
    pub target_ref: String,
    pub amount: crate::domain::Decimal,
    pub lzybra_borrowed: crate::domain::Decimal,
}

impl From<Position> for PositionDto {
    fn from(p: Position) -> Self {
        PositionDto {
            target_kind: p.target.kind_str().to_string(),
            target_ref: p.target.ref_str().to_string(),
            amount: p.amount,
            lzybra_borrowed: p.lzybra_borrowed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDto {
    pub id: WalletId,
    pub user_id: UserId,
    pub address: String,
    pub kind: WalletKind,
    pub total_invested: crate::domain::Decimal,
    pub lzybra_borrowed: crate::domain::Decimal,
    pub created_at: i64,
    pub positions: Vec<PositionDto>,
}

impl From<Wallet> for WalletDto {
    fn from(w: Wallet) -> Self {
        WalletDto {
            id: w.id,
            user_id: w.user_id,
            address: w.address,
            kind: w.kind,
            total_invested: w.total_invested,
            lzybra_borrowed: w.lzybra_borrowed,
            created_at: w.created_at.as_ms(),
            positions: w.positions.into_iter().map(PositionDto::from).collect(),
        }
    }
}

pub async fn register_wallet(
    State(state): State<AppState>,
    Json(req): Json<RegisterWalletRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WalletDto>>), AppError> {
    if req.address.trim().is_empty() {
        return Err(AppError::Validation("address must not be empty".into()));
    }
    let kind = WalletKind::parse(&req.kind).ok_or_else(|| {
        AppError::Validation(format!(
            "kind must be 'web3-wallet' or 'abstraction-wallet', got '{}'",
            req.kind
        ))
    })?;

    let user_id = UserId::new(req.user_id);
    if state.repo.get_user(&user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    let wallet = Wallet::new(user_id, req.address, kind);
    state.repo.insert_wallet(&wallet).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!(
                "Address {} is already registered",
                wallet.address
            ))
        } else {
            AppError::from(e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Wallet registered", WalletDto::from(wallet)),
    ))
}

pub async fn list_wallets(
    State(state): State<AppState>,
    Query(params): Query<ListWalletsQuery>,
) -> Result<Json<ApiResponse<Vec<WalletDto>>>, AppError> {
    let user_id = UserId::new(params.user_id);
    let wallets = state
        .repo
        .list_wallets(&user_id)
        .await?
        .into_iter()
        .map(WalletDto::from)
        .collect();

    Ok(ApiResponse::ok("Wallets", wallets))
}

pub async fn reconcile_wallet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ReconcileOutcome>>, AppError> {
    let wallet_id = WalletId::new(id);
    let outcome = rebuild_wallet_totals(&state.repo, &wallet_id).await?;
    Ok(ApiResponse::ok("Wallet totals reconciled", outcome))
}
