use crate::api::{ApiResponse, AppState};
use crate::domain::{Decimal, TransactionRecord, TxStatus, TxType, UserId, WalletId};
use crate::engine::{resolve_target, ApplyTransaction};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTransactionRequest {
    pub user_id: String,
    pub wallet_id: String,
    pub tx_type: String,
    /// Asset symbol or pool address; resolved against the catalogs.
    pub target: String,
    pub amount: Decimal,
    #[serde(default)]
    pub lzybra_borrowed: Option<Decimal>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    pub user_id: String,
    pub wallet_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    pub user_id: UserId,
    pub wallet_id: WalletId,
    pub tx_type: TxType,
    pub target_kind: String,
    pub target_ref: String,
    pub amount: Decimal,
    pub lzybra_borrowed: Decimal,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub time_ms: i64,
}

impl From<TransactionRecord> for TransactionDto {
    fn from(r: TransactionRecord) -> Self {
        TransactionDto {
            id: r.id,
            user_id: r.user_id,
            wallet_id: r.wallet_id,
            tx_type: r.tx_type,
            target_kind: r.target.kind_str().to_string(),
            target_ref: r.target.ref_str().to_string(),
            amount: r.amount,
            lzybra_borrowed: r.lzybra_borrowed,
            status: r.status,
            error: r.error,
            tx_hash: r.tx_hash,
            time_ms: r.time_ms.as_ms(),
        }
    }
}

pub async fn apply_transaction(
    State(state): State<AppState>,
    Json(req): Json<ApplyTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionDto>>), AppError> {
    let tx_type = TxType::parse(&req.tx_type).ok_or_else(|| {
        AppError::Validation(format!(
            "txType must be 'deposit' or 'withdraw', got '{}'",
            req.tx_type
        ))
    })?;
    if req.target.trim().is_empty() {
        return Err(AppError::Validation("target must not be empty".into()));
    }

    let target = resolve_target(&state.repo, &req.target).await?;

    let record = state
        .ledger
        .apply(ApplyTransaction {
            user_id: UserId::new(req.user_id),
            wallet_id: WalletId::new(req.wallet_id),
            tx_type,
            target,
            amount: req.amount,
            lzybra_borrowed: req.lzybra_borrowed.unwrap_or_else(Decimal::zero),
            tx_hash: req.tx_hash,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Transaction applied", TransactionDto::from(record)),
    ))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListTransactionsQuery>,
) -> Result<Json<ApiResponse<Vec<TransactionDto>>>, AppError> {
    let user_id = UserId::new(params.user_id);
    let wallet_id = params.wallet_id.map(WalletId::new);

    let records = state
        .repo
        .list_transactions(&user_id, wallet_id.as_ref())
        .await?
        .into_iter()
        .map(TransactionDto::from)
        .collect();

    Ok(ApiResponse::ok("Transactions", records))
}
