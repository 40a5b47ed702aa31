//! Wallet and position persistence, including the guarded ledger commit.

use sqlx::Row;

use super::{parse_stored_decimal, Repository};
use crate::domain::{
    Decimal, Position, Target, TimeMs, TransactionRecord, UserId, Wallet, WalletId, WalletKind,
};
use tracing::warn;

fn row_to_wallet(row: &sqlx::sqlite::SqliteRow) -> Result<Wallet, sqlx::Error> {
    let kind_str: String = row.get("kind");
    let kind = WalletKind::parse(&kind_str).unwrap_or(WalletKind::Web3Wallet);

    let total_invested: String = row.get("total_invested");
    let lzybra_borrowed: String = row.get("lzybra_borrowed");

    Ok(Wallet {
        id: WalletId::new(row.get("id")),
        user_id: UserId::new(row.get("user_id")),
        address: row.get("address"),
        kind,
        total_invested: parse_stored_decimal("wallets.total_invested", &total_invested)?,
        lzybra_borrowed: parse_stored_decimal("wallets.lzybra_borrowed", &lzybra_borrowed)?,
        version: row.get("version"),
        created_at: TimeMs::new(row.get("created_at_ms")),
        positions: Vec::new(),
    })
}

fn row_to_position(row: &sqlx::sqlite::SqliteRow) -> Result<Option<Position>, sqlx::Error> {
    let kind: String = row.get("target_kind");
    let reference: String = row.get("target_ref");
    let Some(target) = Target::from_parts(&kind, &reference) else {
        warn!(kind = kind, reference = reference, "Unknown position target kind, skipping row");
        return Ok(None);
    };

    let amount: String = row.get("amount");
    let lzybra_borrowed: String = row.get("lzybra_borrowed");

    Ok(Some(Position {
        target,
        amount: parse_stored_decimal("wallet_positions.amount", &amount)?,
        lzybra_borrowed: parse_stored_decimal("wallet_positions.lzybra_borrowed", &lzybra_borrowed)?,
    }))
}

impl Repository {
    /// Insert a freshly created wallet (no positions yet).
    ///
    /// # Errors
    /// Returns a unique-violation error if the address is already claimed.
    pub async fn insert_wallet(&self, wallet: &Wallet) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, address, kind, total_invested, lzybra_borrowed, version, created_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(wallet.id.as_str())
        .bind(wallet.user_id.as_str())
        .bind(&wallet.address)
        .bind(wallet.kind.as_str())
        .bind(wallet.total_invested.to_canonical_string())
        .bind(wallet.lzybra_borrowed.to_canonical_string())
        .bind(wallet.version)
        .bind(wallet.created_at.as_ms())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Load a wallet with its positions.
    pub async fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<Wallet>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM wallets WHERE id = ?")
            .bind(wallet_id.as_str())
            .fetch_optional(self.pool())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut wallet = row_to_wallet(&row)?;
        wallet.positions = self.load_positions(wallet_id).await?;
        Ok(Some(wallet))
    }

    /// All wallets owned by a user, positions included.
    pub async fn list_wallets(&self, user_id: &UserId) -> Result<Vec<Wallet>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM wallets WHERE user_id = ? ORDER BY created_at_ms ASC, id ASC")
            .bind(user_id.as_str())
            .fetch_all(self.pool())
            .await?;

        let mut wallets = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut wallet = row_to_wallet(row)?;
            wallet.positions = self.load_positions(&wallet.id).await?;
            wallets.push(wallet);
        }
        Ok(wallets)
    }

    async fn load_positions(&self, wallet_id: &WalletId) -> Result<Vec<Position>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT target_kind, target_ref, amount, lzybra_borrowed
            FROM wallet_positions
            WHERE wallet_id = ?
            ORDER BY target_kind ASC, target_ref ASC
            "#,
        )
        .bind(wallet_id.as_str())
        .fetch_all(self.pool())
        .await?;

        let mut positions = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(position) = row_to_position(row)? {
                positions.push(position);
            }
        }
        Ok(positions)
    }

    /// Commit an applied mutation: wallet totals, rewritten positions, and
    /// the ledger record, in one SQL transaction gated on the version the
    /// caller read.
    ///
    /// Returns false without writing anything if a concurrent writer bumped
    /// the version first; the caller re-reads and retries.
    pub async fn persist_wallet_guarded(
        &self,
        wallet: &Wallet,
        expected_version: i64,
        record: &TransactionRecord,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET total_invested = ?, lzybra_borrowed = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(wallet.total_invested.to_canonical_string())
        .bind(wallet.lzybra_borrowed.to_canonical_string())
        .bind(wallet.id.as_str())
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM wallet_positions WHERE wallet_id = ?")
            .bind(wallet.id.as_str())
            .execute(&mut *tx)
            .await?;

        for position in &wallet.positions {
            sqlx::query(
                r#"
                INSERT INTO wallet_positions (wallet_id, target_kind, target_ref, amount, lzybra_borrowed)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(wallet.id.as_str())
            .bind(position.target.kind_str())
            .bind(position.target.ref_str())
            .bind(position.amount.to_canonical_string())
            .bind(position.lzybra_borrowed.to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        insert_transaction_stmt(record).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Overwrite a wallet's cached running totals (reconciliation path).
    ///
    /// Gated on the version the caller read, like `persist_wallet_guarded`:
    /// a ledger commit landing between the caller's read and this write
    /// bumps the version, so the stale totals hit zero rows. Returns false
    /// in that case; the caller re-reads and rebuilds again.
    pub async fn update_wallet_totals(
        &self,
        wallet_id: &WalletId,
        total_invested: Decimal,
        lzybra_borrowed: Decimal,
        expected_version: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET total_invested = ?, lzybra_borrowed = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(total_invested.to_canonical_string())
        .bind(lzybra_borrowed.to_canonical_string())
        .bind(wallet_id.as_str())
        .bind(expected_version)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Shared INSERT used by both the guarded commit and standalone inserts so
/// the column list cannot drift between them.
pub(super) fn insert_transaction_stmt(
    record: &TransactionRecord,
) -> sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(
        r#"
        INSERT INTO transactions
        (id, user_id, wallet_id, tx_type, target_kind, target_ref, amount, lzybra_borrowed, status, error, tx_hash, time_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(record.user_id.as_str())
    .bind(record.wallet_id.as_str())
    .bind(record.tx_type.as_str())
    .bind(record.target.kind_str())
    .bind(record.target.ref_str())
    .bind(record.amount.to_canonical_string())
    .bind(record.lzybra_borrowed.to_canonical_string())
    .bind(record.status.as_str())
    .bind(record.error.as_deref())
    .bind(record.tx_hash.as_deref())
    .bind(record.time_ms.as_ms())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::is_unique_violation;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::{KycStatus, Symbol, TxType, User};

    async fn seed_user(repo: &Repository) -> UserId {
        let user = User {
            id: UserId::generate(),
            first_name: "Ada".to_string(),
            last_name: None,
            email: format!("{}@example.com", UserId::generate()),
            kyc_status: KycStatus::Pending,
            kyc_details: None,
            created_at: TimeMs::now(),
            updated_at: TimeMs::now(),
        };
        repo.insert_user(&user).await.unwrap();
        user.id
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_load_wallet() {
        let (repo, _temp) = setup_test_db().await;
        let user_id = seed_user(&repo).await;
        let wallet = Wallet::new(user_id, "0xabc".to_string(), WalletKind::Web3Wallet);

        repo.insert_wallet(&wallet).await.unwrap();
        let loaded = repo.get_wallet(&wallet.id).await.unwrap().unwrap();

        assert_eq!(loaded.address, "0xabc");
        assert_eq!(loaded.version, 0);
        assert!(loaded.positions.is_empty());
        assert!(loaded.total_invested.is_zero());
    }

    #[tokio::test]
    async fn test_duplicate_address_is_unique_violation() {
        let (repo, _temp) = setup_test_db().await;
        let user_id = seed_user(&repo).await;
        repo.insert_wallet(&Wallet::new(
            user_id.clone(),
            "0xabc".to_string(),
            WalletKind::Web3Wallet,
        ))
        .await
        .unwrap();

        let err = repo
            .insert_wallet(&Wallet::new(
                user_id,
                "0xabc".to_string(),
                WalletKind::Web3Wallet,
            ))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_guarded_persist_commits_positions_and_record() {
        let (repo, _temp) = setup_test_db().await;
        let user_id = seed_user(&repo).await;
        let mut wallet = Wallet::new(user_id.clone(), "0xabc".to_string(), WalletKind::Web3Wallet);
        repo.insert_wallet(&wallet).await.unwrap();

        let target = Target::Asset(Symbol::new("TSLA".to_string()));
        wallet.positions.push(Position {
            target: target.clone(),
            amount: dec("100"),
            lzybra_borrowed: Decimal::zero(),
        });
        wallet.total_invested = dec("100");

        let record = TransactionRecord::completed(
            user_id,
            wallet.id.clone(),
            TxType::Deposit,
            target.clone(),
            dec("100"),
            Decimal::zero(),
            None,
        );

        let committed = repo
            .persist_wallet_guarded(&wallet, 0, &record)
            .await
            .unwrap();
        assert!(committed);

        let loaded = repo.get_wallet(&wallet.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.positions.len(), 1);
        assert_eq!(loaded.positions[0].amount, dec("100"));

        let ledger = repo.list_transactions(&loaded.user_id, None).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].target, target);
    }

    #[tokio::test]
    async fn test_guarded_persist_rejects_stale_version() {
        let (repo, _temp) = setup_test_db().await;
        let user_id = seed_user(&repo).await;
        let wallet = Wallet::new(user_id.clone(), "0xabc".to_string(), WalletKind::Web3Wallet);
        repo.insert_wallet(&wallet).await.unwrap();

        let record = TransactionRecord::completed(
            user_id.clone(),
            wallet.id.clone(),
            TxType::Deposit,
            Target::Asset(Symbol::new("TSLA".to_string())),
            dec("1"),
            Decimal::zero(),
            None,
        );

        // Stale expected version: nothing may be written, not even the record.
        let committed = repo
            .persist_wallet_guarded(&wallet, 7, &record)
            .await
            .unwrap();
        assert!(!committed);

        let loaded = repo.get_wallet(&wallet.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 0);
        assert!(repo
            .list_transactions(&user_id, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_totals_update_rejects_stale_version() {
        let (repo, _temp) = setup_test_db().await;
        let user_id = seed_user(&repo).await;
        let wallet = Wallet::new(user_id, "0xabc".to_string(), WalletKind::Web3Wallet);
        repo.insert_wallet(&wallet).await.unwrap();

        let committed = repo
            .update_wallet_totals(&wallet.id, dec("50"), dec("5"), wallet.version)
            .await
            .unwrap();
        assert!(committed);

        // The first update bumped the version; the original one is stale now.
        let committed = repo
            .update_wallet_totals(&wallet.id, dec("999"), dec("7"), wallet.version)
            .await
            .unwrap();
        assert!(!committed);

        let loaded = repo.get_wallet(&wallet.id).await.unwrap().unwrap();
        assert_eq!(loaded.total_invested, dec("50"));
        assert_eq!(loaded.lzybra_borrowed, dec("5"));
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_corrupted_stored_total_fails_the_read() {
        let (repo, _temp) = setup_test_db().await;
        let user_id = seed_user(&repo).await;
        let wallet = Wallet::new(user_id, "0xabc".to_string(), WalletKind::Web3Wallet);
        repo.insert_wallet(&wallet).await.unwrap();

        sqlx::query("UPDATE wallets SET total_invested = 'garbage' WHERE id = ?")
            .bind(wallet.id.as_str())
            .execute(repo.pool())
            .await
            .unwrap();

        let err = repo.get_wallet(&wallet.id).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::ColumnDecode { .. }));
    }

    #[tokio::test]
    async fn test_list_wallets_scoped_to_user() {
        let (repo, _temp) = setup_test_db().await;
        let user_a = seed_user(&repo).await;
        let user_b = seed_user(&repo).await;

        repo.insert_wallet(&Wallet::new(
            user_a.clone(),
            "0xaaa".to_string(),
            WalletKind::Web3Wallet,
        ))
        .await
        .unwrap();
        repo.insert_wallet(&Wallet::new(
            user_b,
            "0xbbb".to_string(),
            WalletKind::AbstractionWallet,
        ))
        .await
        .unwrap();

        let wallets = repo.list_wallets(&user_a).await.unwrap();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].address, "0xaaa");
    }
}
