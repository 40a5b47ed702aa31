//! Append-only transaction records: the ledger.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Decimal, Target, TimeMs, UserId, WalletId};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Deposit,
    Withdraw,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Deposit => "deposit",
            TxType::Withdraw => "withdraw",
        }
    }

    pub fn parse(s: &str) -> Option<TxType> {
        match s {
            "deposit" => Some(TxType::Deposit),
            "withdraw" => Some(TxType::Withdraw),
            _ => None,
        }
    }
}

/// Lifecycle of a ledger entry. Records never change after insert except the
/// pending -> completed/failed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<TxStatus> {
        match s {
            "pending" => Some(TxStatus::Pending),
            "completed" => Some(TxStatus::Completed),
            "failed" => Some(TxStatus::Failed),
            _ => None,
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: String,
    pub user_id: UserId,
    pub wallet_id: WalletId,
    pub tx_type: TxType,
    pub target: Target,
    pub amount: Decimal,
    pub lzybra_borrowed: Decimal,
    pub status: TxStatus,
    pub error: Option<String>,
    pub tx_hash: Option<String>,
    pub time_ms: TimeMs,
}

impl TransactionRecord {
    /// A completed entry for a successfully applied mutation.
    pub fn completed(
        user_id: UserId,
        wallet_id: WalletId,
        tx_type: TxType,
        target: Target,
        amount: Decimal,
        lzybra_borrowed: Decimal,
        tx_hash: Option<String>,
    ) -> Self {
        TransactionRecord {
            id: Uuid::new_v4().to_string(),
            user_id,
            wallet_id,
            tx_type,
            target,
            amount,
            lzybra_borrowed,
            status: TxStatus::Completed,
            error: None,
            tx_hash,
            time_ms: TimeMs::now(),
        }
    }

    /// A failed entry recording why a validated mutation could not commit.
    pub fn failed(
        user_id: UserId,
        wallet_id: WalletId,
        tx_type: TxType,
        target: Target,
        amount: Decimal,
        lzybra_borrowed: Decimal,
        error: String,
    ) -> Self {
        TransactionRecord {
            id: Uuid::new_v4().to_string(),
            user_id,
            wallet_id,
            tx_type,
            target,
            amount,
            lzybra_borrowed,
            status: TxStatus::Failed,
            error: Some(error),
            tx_hash: None,
            time_ms: TimeMs::now(),
        }
    }
}
