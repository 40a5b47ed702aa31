//! Repository layer for database operations.
//!
//! One `Repository` over the connection pool, methods split per domain:
//! - `users.rs` - user accounts and KYC
//! - `wallets.rs` - wallets, positions, and the guarded ledger commit
//! - `catalog.rs` - asset and pool catalogs
//! - `transactions.rs` - ledger queries
//!
//! Monetary values are stored as canonical decimal strings and summed in
//! Rust; SQLite's SUM aggregate returns REAL and would lose precision.

mod catalog;
mod transactions;
mod users;
mod wallets;

use crate::domain::Decimal;
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::error;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Returns true if the error is a unique-key violation, which the API layer
/// maps to `Conflict`.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Parse a decimal column.
///
/// Stored values are only ever written from `to_canonical_string`, so a
/// parse failure means the row was tampered with. The read fails rather
/// than letting a corrupted balance pass as a real one.
pub(crate) fn parse_stored_decimal(
    column: &str,
    value: &str,
) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(value).map_err(|e| {
        error!(
            column = column,
            value = value,
            error = %e,
            "Stored decimal is not parseable"
        );
        sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        }
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::db::init_db;
    use tempfile::TempDir;

    pub async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }
}
