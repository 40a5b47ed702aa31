use crate::api::{ApiResponse, AppState};
use crate::domain::UserId;
use crate::engine::{total_investment, InvestmentTotal};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentQuery {
    pub user_id: String,
}

pub async fn get_total_investment(
    State(state): State<AppState>,
    Query(params): Query<InvestmentQuery>,
) -> Result<Json<ApiResponse<InvestmentTotal>>, AppError> {
    let user_id = UserId::new(params.user_id);
    let total = total_investment(&state.repo, &state.oracle, &user_id).await?;
    Ok(ApiResponse::ok("Total investment", total))
}
