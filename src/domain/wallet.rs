//! Wallets and their cached positions.
//!
//! A wallet caches running totals and per-target positions; the transaction
//! ledger remains the authoritative record (see `engine::reconcile`).

use serde::{Deserialize, Serialize};

use super::{Decimal, Target, TimeMs, UserId, WalletId};

/// How the wallet came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalletKind {
    /// An externally owned address the user linked.
    Web3Wallet,
    /// An account-abstraction wallet deployed on the user's behalf.
    AbstractionWallet,
}

impl WalletKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::Web3Wallet => "web3-wallet",
            WalletKind::AbstractionWallet => "abstraction-wallet",
        }
    }

    pub fn parse(s: &str) -> Option<WalletKind> {
        match s {
            "web3-wallet" => Some(WalletKind::Web3Wallet),
            "abstraction-wallet" => Some(WalletKind::AbstractionWallet),
            _ => None,
        }
    }
}

/// Amount of one asset or pool a wallet holds, plus borrowed-against amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub target: Target,
    pub amount: Decimal,
    pub lzybra_borrowed: Decimal,
}

impl Position {
    /// A position with both fields at exactly zero must not stay in the list.
    pub fn is_empty(&self) -> bool {
        self.amount.is_zero() && self.lzybra_borrowed.is_zero()
    }
}

/// A wallet owned by exactly one user.
///
/// `version` backs the per-wallet optimistic concurrency check: every
/// guarded write bumps it, and a stale writer's update matches zero rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub address: String,
    pub kind: WalletKind,
    pub total_invested: Decimal,
    pub lzybra_borrowed: Decimal,
    pub version: i64,
    pub created_at: TimeMs,
    pub positions: Vec<Position>,
}

impl Wallet {
    /// Create a fresh wallet with no positions and zeroed totals.
    pub fn new(user_id: UserId, address: String, kind: WalletKind) -> Self {
        Wallet {
            id: WalletId::generate(),
            user_id,
            address,
            kind,
            total_invested: Decimal::zero(),
            lzybra_borrowed: Decimal::zero(),
            version: 0,
            created_at: TimeMs::now(),
            positions: Vec::new(),
        }
    }

    pub fn position(&self, target: &Target) -> Option<&Position> {
        self.positions.iter().find(|p| &p.target == target)
    }

    pub fn position_mut(&mut self, target: &Target) -> Option<&mut Position> {
        self.positions.iter_mut().find(|p| &p.target == target)
    }

    /// Drop position entries whose amount and borrowed balance are both zero.
    pub fn prune_empty_positions(&mut self) {
        self.positions.retain(|p| !p.is_empty());
    }
}
