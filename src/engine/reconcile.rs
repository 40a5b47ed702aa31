//! Rebuilds a wallet's cached totals from its ledger history.
//!
//! The transaction ledger is the source of truth; the totals stored on the
//! wallet row are a cache. This replays every completed deposit and withdraw
//! and rewrites the cache when it has drifted.

use backoff::future::retry;
use backoff::ExponentialBackoff;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::db::Repository;
use crate::domain::{Decimal, TxType, WalletId};
use crate::engine::ledger::LedgerError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub total_invested: Decimal,
    pub lzybra_borrowed: Decimal,
    pub diverged: bool,
}

/// Rebuild a wallet's cached totals from its completed ledger rows.
///
/// The rewrite is gated on the wallet version read at the start; a ledger
/// commit racing in between bumps the version and the whole rebuild runs
/// again, so concurrent writes are never clobbered with stale totals.
pub async fn rebuild_wallet_totals(
    repo: &Repository,
    wallet_id: &WalletId,
) -> Result<ReconcileOutcome, LedgerError> {
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(5)),
        ..Default::default()
    };

    retry(policy, || async {
        try_rebuild(repo, wallet_id).await.map_err(|e| match e {
            LedgerError::WriteConflict(_) => {
                debug!(wallet = %wallet_id, "Version conflict, retrying rebuild");
                backoff::Error::transient(e)
            }
            other => backoff::Error::permanent(other),
        })
    })
    .await
}

async fn try_rebuild(
    repo: &Repository,
    wallet_id: &WalletId,
) -> Result<ReconcileOutcome, LedgerError> {
    let wallet = repo
        .get_wallet(wallet_id)
        .await?
        .ok_or_else(|| LedgerError::WalletNotFound(format!("Wallet {} not found", wallet_id)))?;

    let records = repo.list_completed_for_wallet(wallet_id).await?;

    let mut total_invested = Decimal::zero();
    let mut lzybra_borrowed = Decimal::zero();
    for record in &records {
        match record.tx_type {
            TxType::Deposit => {
                total_invested = total_invested + record.amount;
                lzybra_borrowed = lzybra_borrowed + record.lzybra_borrowed;
            }
            TxType::Withdraw => {
                total_invested = total_invested - record.amount;
                lzybra_borrowed = lzybra_borrowed - record.lzybra_borrowed;
            }
        }
    }

    let diverged =
        wallet.total_invested != total_invested || wallet.lzybra_borrowed != lzybra_borrowed;

    if diverged {
        warn!(
            wallet_id = %wallet_id,
            cached_invested = %wallet.total_invested,
            rebuilt_invested = %total_invested,
            cached_borrowed = %wallet.lzybra_borrowed,
            rebuilt_borrowed = %lzybra_borrowed,
            "Wallet totals diverged from ledger, rewriting cache"
        );
        let committed = repo
            .update_wallet_totals(wallet_id, total_invested, lzybra_borrowed, wallet.version)
            .await?;
        if !committed {
            return Err(LedgerError::WriteConflict(format!(
                "Wallet {} changed during rebuild",
                wallet_id
            )));
        }
    } else {
        info!(wallet_id = %wallet_id, "Wallet totals match ledger");
    }

    Ok(ReconcileOutcome {
        total_invested,
        lzybra_borrowed,
        diverged,
    })
}
