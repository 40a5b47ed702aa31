//! Domain types: ids, decimals, and the persisted entities.

pub mod catalog;
pub mod decimal;
pub mod primitives;
pub mod transaction;
pub mod user;
pub mod wallet;

pub use catalog::{Asset, FeedKind, Pool, PriceFeeds, Target};
pub use decimal::Decimal;
pub use primitives::{PoolAddress, Symbol, TimeMs, UserId, WalletId};
pub use transaction::{TransactionRecord, TxStatus, TxType};
pub use user::{KycDetails, KycStatus, User};
pub use wallet::{Position, Wallet, WalletKind};
