//! Holdings aggregator: unified per-asset and per-pool totals across all of
//! a user's wallets.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::db::Repository;
use crate::domain::{Asset, Decimal, Pool, PoolAddress, Symbol, Target, UserId};

/// Aggregated position in one catalog asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetHolding {
    #[serde(flatten)]
    pub asset: Asset,
    pub total_amount: Decimal,
    pub total_lzybra_borrowed: Decimal,
}

/// Aggregated position in one catalog pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolHolding {
    #[serde(flatten)]
    pub pool: Pool,
    pub total_amount: Decimal,
    pub total_lzybra_borrowed: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holdings {
    pub assets: Vec<AssetHolding>,
    pub pools: Vec<PoolHolding>,
}

/// Combine every wallet's positions into per-target buckets.
///
/// Buckets are seeded from catalog attributes on first encounter and keyed
/// in a BTreeMap, so the output order is deterministic and independent of
/// wallet order; addition is commutative, so the totals are too. A user
/// with no wallets gets empty lists, not an error.
pub async fn aggregate_holdings(
    repo: &Repository,
    user_id: &UserId,
) -> Result<Holdings, sqlx::Error> {
    let wallets = repo.list_wallets(user_id).await?;

    let mut asset_buckets: BTreeMap<Symbol, AssetHolding> = BTreeMap::new();
    let mut pool_buckets: BTreeMap<PoolAddress, PoolHolding> = BTreeMap::new();

    for wallet in &wallets {
        for position in &wallet.positions {
            match &position.target {
                Target::Asset(symbol) => {
                    if !asset_buckets.contains_key(symbol) {
                        match repo.get_asset(symbol).await? {
                            Some(asset) => {
                                asset_buckets.insert(
                                    symbol.clone(),
                                    AssetHolding {
                                        asset,
                                        total_amount: Decimal::zero(),
                                        total_lzybra_borrowed: Decimal::zero(),
                                    },
                                );
                            }
                            None => {
                                // Catalog entry was deleted after the position
                                // was written; nothing to seed from.
                                warn!(symbol = %symbol, "Position references missing asset, skipping");
                                continue;
                            }
                        }
                    }
                    if let Some(bucket) = asset_buckets.get_mut(symbol) {
                        bucket.total_amount = bucket.total_amount + position.amount;
                        bucket.total_lzybra_borrowed =
                            bucket.total_lzybra_borrowed + position.lzybra_borrowed;
                    }
                }
                Target::Pool(address) => {
                    if !pool_buckets.contains_key(address) {
                        match repo.get_pool(address).await? {
                            Some(pool) => {
                                pool_buckets.insert(
                                    address.clone(),
                                    PoolHolding {
                                        pool,
                                        total_amount: Decimal::zero(),
                                        total_lzybra_borrowed: Decimal::zero(),
                                    },
                                );
                            }
                            None => {
                                warn!(address = %address, "Position references missing pool, skipping");
                                continue;
                            }
                        }
                    }
                    if let Some(bucket) = pool_buckets.get_mut(address) {
                        bucket.total_amount = bucket.total_amount + position.amount;
                        bucket.total_lzybra_borrowed =
                            bucket.total_lzybra_borrowed + position.lzybra_borrowed;
                    }
                }
            }
        }
    }

    Ok(Holdings {
        assets: asset_buckets.into_values().collect(),
        pools: pool_buckets.into_values().collect(),
    })
}
