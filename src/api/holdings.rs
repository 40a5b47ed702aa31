use crate::api::{ApiResponse, AppState};
use crate::domain::UserId;
use crate::engine::{aggregate_holdings, Holdings};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsQuery {
    pub user_id: String,
}

pub async fn get_holdings(
    State(state): State<AppState>,
    Query(params): Query<HoldingsQuery>,
) -> Result<Json<ApiResponse<Holdings>>, AppError> {
    let user_id = UserId::new(params.user_id);
    let holdings = aggregate_holdings(&state.repo, &user_id).await?;
    Ok(ApiResponse::ok("Holdings", holdings))
}
