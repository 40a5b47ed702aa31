//! Core logic: ledger writes, holdings aggregation, investment totals, and
//! ledger/cache reconciliation.

pub mod holdings;
pub mod investment;
pub mod ledger;
pub mod reconcile;

pub use holdings::{aggregate_holdings, AssetHolding, Holdings, PoolHolding};
pub use investment::{total_investment, InvestmentError, InvestmentTotal};
pub use ledger::{resolve_target, ApplyTransaction, LedgerError, LedgerWriter};
pub use reconcile::{rebuild_wallet_totals, ReconcileOutcome};
