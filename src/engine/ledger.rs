//! Transaction ledger writer.
//!
//! Applies a deposit or withdraw to a wallet's cached positions and appends
//! the ledger record in the same SQL transaction. Writers racing on the same
//! wallet are serialized by the wallet's version column: the loser of a race
//! re-reads and reapplies against fresh state.

use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::Repository;
use crate::domain::{
    Decimal, PoolAddress, Position, Symbol, Target, TransactionRecord, TxType, UserId, Wallet,
    WalletId,
};

/// A validated mutation request against one wallet.
#[derive(Debug, Clone)]
pub struct ApplyTransaction {
    pub user_id: UserId,
    pub wallet_id: WalletId,
    pub tx_type: TxType,
    pub target: Target,
    pub amount: Decimal,
    pub lzybra_borrowed: Decimal,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    UnknownTarget(String),
    #[error("{0}")]
    WalletNotFound(String),
    #[error("{0}")]
    NoSuchHolding(String),
    #[error("{0}")]
    InsufficientBalance(String),
    #[error("{0}")]
    WriteConflict(String),
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Resolve a raw reference against the catalogs: asset symbol first, then
/// pool address. The API boundary calls this once and passes the typed
/// target down.
pub async fn resolve_target(repo: &Repository, reference: &str) -> Result<Target, LedgerError> {
    let symbol = Symbol::new(reference.to_string());
    if repo.get_asset(&symbol).await?.is_some() {
        return Ok(Target::Asset(symbol));
    }

    let address = PoolAddress::new(reference.to_string());
    if repo.get_pool(&address).await?.is_some() {
        return Ok(Target::Pool(address));
    }

    Err(LedgerError::UnknownTarget(format!(
        "'{}' matches no asset symbol or pool address",
        reference
    )))
}

pub struct LedgerWriter {
    repo: Arc<Repository>,
}

impl LedgerWriter {
    pub fn new(repo: Arc<Repository>) -> Self {
        LedgerWriter { repo }
    }

    /// Apply a deposit or withdraw.
    ///
    /// On success exactly one completed ledger record exists for the
    /// mutation, committed together with the wallet update. Business-rule
    /// rejections (`NoSuchHolding`, `InsufficientBalance`) leave no trace.
    /// A commit that passed validation but could not go through (conflict
    /// retries exhausted, storage failure) is recorded as a failed entry.
    pub async fn apply(&self, req: ApplyTransaction) -> Result<TransactionRecord, LedgerError> {
        if req.amount.is_negative() {
            return Err(LedgerError::Validation("amount must not be negative".into()));
        }
        if req.lzybra_borrowed.is_negative() {
            return Err(LedgerError::Validation(
                "lzybra_borrowed must not be negative".into(),
            ));
        }

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(5)),
            ..Default::default()
        };

        let result = retry(policy, || async {
            self.try_apply(&req).await.map_err(|e| match e {
                LedgerError::WriteConflict(_) => {
                    debug!(wallet = %req.wallet_id, "Version conflict, retrying apply");
                    backoff::Error::transient(e)
                }
                other => backoff::Error::permanent(other),
            })
        })
        .await;

        match result {
            Ok(record) => Ok(record),
            Err(err) => {
                if matches!(
                    err,
                    LedgerError::WriteConflict(_) | LedgerError::Storage(_)
                ) {
                    self.record_failed_apply(&req, &err).await;
                }
                Err(err)
            }
        }
    }

    async fn try_apply(&self, req: &ApplyTransaction) -> Result<TransactionRecord, LedgerError> {
        let mut wallet = self
            .repo
            .get_wallet(&req.wallet_id)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(format!("Wallet {} not found", req.wallet_id)))?;

        if wallet.user_id != req.user_id {
            return Err(LedgerError::WalletNotFound(format!(
                "Wallet {} not found for user {}",
                req.wallet_id, req.user_id
            )));
        }

        let expected_version = wallet.version;
        apply_to_wallet(&mut wallet, req)?;

        let record = TransactionRecord::completed(
            req.user_id.clone(),
            wallet.id.clone(),
            req.tx_type,
            req.target.clone(),
            req.amount,
            req.lzybra_borrowed,
            req.tx_hash.clone(),
        );

        let committed = self
            .repo
            .persist_wallet_guarded(&wallet, expected_version, &record)
            .await?;

        if committed {
            Ok(record)
        } else {
            Err(LedgerError::WriteConflict(format!(
                "wallet {} was modified concurrently",
                wallet.id
            )))
        }
    }

    /// Best-effort failed entry so the ledger explains a validated mutation
    /// that never committed.
    async fn record_failed_apply(&self, req: &ApplyTransaction, err: &LedgerError) {
        let failed = TransactionRecord::failed(
            req.user_id.clone(),
            req.wallet_id.clone(),
            req.tx_type,
            req.target.clone(),
            req.amount,
            req.lzybra_borrowed,
            err.to_string(),
        );
        if let Err(e) = self.repo.insert_transaction(&failed).await {
            warn!(
                wallet = %req.wallet_id,
                error = %e,
                "Could not record failed transaction"
            );
        }
    }
}

/// Pure state transition: mutate the in-memory wallet or reject with no
/// change observable to the caller's subsequent persist.
fn apply_to_wallet(wallet: &mut Wallet, req: &ApplyTransaction) -> Result<(), LedgerError> {
    match req.tx_type {
        TxType::Deposit => {
            match wallet.position_mut(&req.target) {
                Some(position) => {
                    position.amount = position.amount + req.amount;
                    position.lzybra_borrowed = position.lzybra_borrowed + req.lzybra_borrowed;
                }
                None => wallet.positions.push(Position {
                    target: req.target.clone(),
                    amount: req.amount,
                    lzybra_borrowed: req.lzybra_borrowed,
                }),
            }
            wallet.total_invested = wallet.total_invested + req.amount;
            wallet.lzybra_borrowed = wallet.lzybra_borrowed + req.lzybra_borrowed;
        }
        TxType::Withdraw => {
            let position = wallet.position_mut(&req.target).ok_or_else(|| {
                LedgerError::NoSuchHolding(format!(
                    "Cannot withdraw from a non-existent holding {}",
                    req.target
                ))
            })?;

            // Both decrements are checked before either is applied.
            let new_amount = position.amount.checked_sub_non_negative(req.amount);
            let new_borrowed = position
                .lzybra_borrowed
                .checked_sub_non_negative(req.lzybra_borrowed);
            let (Some(new_amount), Some(new_borrowed)) = (new_amount, new_borrowed) else {
                return Err(LedgerError::InsufficientBalance(format!(
                    "Insufficient balance in {} to withdraw {}",
                    req.target, req.amount
                )));
            };

            position.amount = new_amount;
            position.lzybra_borrowed = new_borrowed;
            wallet.total_invested = wallet.total_invested - req.amount;
            wallet.lzybra_borrowed = wallet.lzybra_borrowed - req.lzybra_borrowed;
        }
    }

    wallet.prune_empty_positions();
    Ok(())
}
