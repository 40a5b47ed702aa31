use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API-boundary error taxonomy.
///
/// Lower-level failures (store, oracle, ledger) surface here unchanged as a
/// single tagged failure with a human-readable message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("No such holding: {0}")]
    NoSuchHolding(String),
    #[error("Unknown target: {0}")]
    UnknownTarget(String),
    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<crate::oracle::PriceError> for AppError {
    fn from(err: crate::oracle::PriceError) -> Self {
        AppError::PriceUnavailable(err.to_string())
    }
}

impl From<crate::engine::ledger::LedgerError> for AppError {
    fn from(err: crate::engine::ledger::LedgerError) -> Self {
        use crate::engine::ledger::LedgerError;
        match err {
            LedgerError::Validation(msg) => AppError::Validation(msg),
            LedgerError::UnknownTarget(msg) => AppError::UnknownTarget(msg),
            LedgerError::WalletNotFound(msg) => AppError::NotFound(msg),
            LedgerError::NoSuchHolding(msg) => AppError::NoSuchHolding(msg),
            LedgerError::InsufficientBalance(msg) => AppError::InsufficientBalance(msg),
            LedgerError::WriteConflict(msg) => AppError::Conflict(msg),
            LedgerError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}

impl From<crate::engine::investment::InvestmentError> for AppError {
    fn from(err: crate::engine::investment::InvestmentError) -> Self {
        use crate::engine::investment::InvestmentError;
        match err {
            InvestmentError::Price(e) => AppError::PriceUnavailable(e.to_string()),
            InvestmentError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            // Business-rule rejections are the caller's problem, not a 5xx.
            AppError::InsufficientBalance(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NoSuchHolding(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::UnknownTarget(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::PriceUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "message": message,
            "success": false,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("n".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("c".into()), StatusCode::CONFLICT),
            (
                AppError::InsufficientBalance("i".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::NoSuchHolding("h".into()), StatusCode::BAD_REQUEST),
            (AppError::UnknownTarget("u".into()), StatusCode::NOT_FOUND),
            (
                AppError::PriceUnavailable("p".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Storage("s".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
