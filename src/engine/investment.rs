//! USD investment totals: net asset flows from the ledger priced through the
//! oracle.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::db::Repository;
use crate::domain::{Decimal, Symbol, Target, TxType, UserId};
use crate::oracle::{Oracle, PriceError};

#[derive(Debug, thiserror::Error)]
pub enum InvestmentError {
    #[error("price lookup failed: {0}")]
    Price(#[from] PriceError),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Result of a total-investment calculation.
///
/// `skipped_symbols` lists assets with ledger activity but no catalog entry;
/// their value cannot be priced and is excluded from `total_usd`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentTotal {
    pub total_usd: Decimal,
    pub skipped_symbols: Vec<Symbol>,
}

/// Sum the USD value of a user's net asset deposits.
///
/// Only completed deposit and withdraw transactions against catalog assets
/// count. Net flow per symbol is deposits minus withdraws; symbols with a
/// non-positive net contribute nothing. Pool transactions have no USD quote
/// and are ignored. Any price lookup failure aborts the whole calculation
/// rather than returning a partial total.
pub async fn total_investment(
    repo: &Repository,
    oracle: &Oracle,
    user_id: &UserId,
) -> Result<InvestmentTotal, InvestmentError> {
    let records = repo.list_completed_deposit_withdraw(user_id).await?;

    let mut net_by_symbol: BTreeMap<Symbol, Decimal> = BTreeMap::new();
    for record in &records {
        let symbol = match &record.target {
            Target::Asset(symbol) => symbol.clone(),
            Target::Pool(_) => continue,
        };
        let entry = net_by_symbol.entry(symbol).or_insert_with(Decimal::zero);
        match record.tx_type {
            TxType::Deposit => *entry = *entry + record.amount,
            TxType::Withdraw => *entry = *entry - record.amount,
        }
    }

    let mut total_usd = Decimal::zero();
    let mut skipped_symbols = Vec::new();

    for (symbol, net) in &net_by_symbol {
        if !net.is_positive() {
            continue;
        }
        match repo.get_asset(symbol).await? {
            Some(asset) => {
                let price = oracle.usd_price(&asset).await?;
                total_usd = total_usd + *net * price;
            }
            None => {
                warn!(symbol = %symbol, "Ledger references asset missing from catalog, skipping");
                skipped_symbols.push(symbol.clone());
            }
        }
    }

    Ok(InvestmentTotal {
        total_usd,
        skipped_symbols,
    })
}
