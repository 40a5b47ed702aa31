//! User account and KYC state.

use serde::{Deserialize, Serialize};

use super::{TimeMs, UserId};

/// KYC review state for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<KycStatus> {
        match s {
            "pending" => Some(KycStatus::Pending),
            "approved" => Some(KycStatus::Approved),
            "rejected" => Some(KycStatus::Rejected),
            _ => None,
        }
    }
}

/// Submitted KYC document details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycDetails {
    pub document_type: String,
    pub document_number: String,
    pub document_image: String,
    pub submitted_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<TimeMs>,
}

/// A registered user. Authentication happens upstream; this crate receives
/// an already-authenticated user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email: String,
    pub kyc_status: KycStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyc_details: Option<KycDetails>,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}
