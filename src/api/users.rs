use crate::api::wallets::WalletDto;
use crate::api::{ApiResponse, AppState};
use crate::db::repo::is_unique_violation;
use crate::domain::{KycDetails, KycStatus, TimeMs, User, UserId};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    /// Omitting the field leaves the name unchanged; an explicit
    /// `"lastName": null` clears it.
    #[serde(default, deserialize_with = "present_or_null")]
    pub last_name: Option<Option<String>>,
}

/// Maps a present field (value or null) to `Some(..)`; an absent field
/// falls through to the serde default of `None`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitKycRequest {
    pub document_type: String,
    pub document_number: String,
    pub document_image: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateKycRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDto {
    #[serde(flatten)]
    pub user: User,
    pub wallets: Vec<WalletDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycStateDto {
    pub kyc_status: KycStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyc_details: Option<KycDetails>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), AppError> {
    if req.first_name.trim().is_empty() {
        return Err(AppError::Validation("firstName must not be empty".into()));
    }
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(AppError::Validation("email is not valid".into()));
    }

    let now = TimeMs::now();
    let user = User {
        id: UserId::generate(),
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        kyc_status: KycStatus::Pending,
        kyc_details: None,
        created_at: now,
        updated_at: now,
    };

    state.repo.insert_user(&user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email {} is already registered", user.email))
        } else {
            AppError::from(e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User created", user),
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserProfileDto>>, AppError> {
    let user_id = UserId::new(id);
    let user = state
        .repo
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    let wallets = state
        .repo
        .list_wallets(&user_id)
        .await?
        .into_iter()
        .map(WalletDto::from)
        .collect();

    Ok(ApiResponse::ok(
        "User profile",
        UserProfileDto { user, wallets },
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    if let Some(first_name) = &req.first_name {
        if first_name.trim().is_empty() {
            return Err(AppError::Validation("firstName must not be empty".into()));
        }
    }

    let user_id = UserId::new(id);
    let user = state
        .repo
        .update_user_profile(
            &user_id,
            req.first_name.as_deref(),
            req.last_name.as_ref().map(|name| name.as_deref()),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    Ok(ApiResponse::ok("User updated", user))
}

pub async fn submit_kyc(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitKycRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    if req.document_type.trim().is_empty() || req.document_number.trim().is_empty() {
        return Err(AppError::Validation(
            "documentType and documentNumber are required".into(),
        ));
    }

    let details = KycDetails {
        document_type: req.document_type,
        document_number: req.document_number,
        document_image: req.document_image,
        submitted_at: TimeMs::now(),
        approved_at: None,
    };

    let user_id = UserId::new(id);
    let user = state
        .repo
        .submit_kyc(&user_id, &details)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    Ok(ApiResponse::ok("KYC submitted", user))
}

pub async fn get_kyc(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<KycStateDto>>, AppError> {
    let user_id = UserId::new(id);
    let user = state
        .repo
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    Ok(ApiResponse::ok(
        "KYC status",
        KycStateDto {
            kyc_status: user.kyc_status,
            kyc_details: user.kyc_details,
        },
    ))
}

pub async fn update_kyc(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateKycRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let status = match KycStatus::parse(&req.status) {
        Some(KycStatus::Approved) => KycStatus::Approved,
        Some(KycStatus::Rejected) => KycStatus::Rejected,
        // Reviewers decide, they never send a user back to pending.
        _ => {
            return Err(AppError::Validation(
                "status must be 'approved' or 'rejected'".into(),
            ))
        }
    };

    let user_id = UserId::new(id);
    let user = state
        .repo
        .set_kyc_status(&user_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    Ok(ApiResponse::ok("KYC status updated", user))
}
