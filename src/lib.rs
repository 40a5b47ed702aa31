pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod oracle;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Asset, Decimal, FeedKind, Pool, PoolAddress, Symbol, Target, TimeMs, TransactionRecord,
    TxStatus, TxType, UserId, Wallet, WalletId, WalletKind,
};
pub use engine::LedgerWriter;
pub use error::AppError;
pub use oracle::{HttpPriceSource, MockPriceSource, Oracle, PriceError, PriceSource};
