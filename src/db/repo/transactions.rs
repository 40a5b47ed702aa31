//! Ledger queries. Records are append-only; nothing here mutates them.

use sqlx::Row;
use tracing::warn;

use super::wallets::insert_transaction_stmt;
use super::{parse_stored_decimal, Repository};
use crate::domain::{
    Target, TimeMs, TransactionRecord, TxStatus, TxType, UserId, WalletId,
};

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<Option<TransactionRecord>, sqlx::Error> {
    let id: String = row.get("id");

    let tx_type_str: String = row.get("tx_type");
    let Some(tx_type) = TxType::parse(&tx_type_str) else {
        warn!(id = id, tx_type = tx_type_str, "Unknown tx_type, skipping row");
        return Ok(None);
    };

    let status_str: String = row.get("status");
    let Some(status) = TxStatus::parse(&status_str) else {
        warn!(id = id, status = status_str, "Unknown status, skipping row");
        return Ok(None);
    };

    let kind: String = row.get("target_kind");
    let reference: String = row.get("target_ref");
    let Some(target) = Target::from_parts(&kind, &reference) else {
        warn!(id = id, kind = kind, "Unknown target kind, skipping row");
        return Ok(None);
    };

    let amount: String = row.get("amount");
    let lzybra_borrowed: String = row.get("lzybra_borrowed");

    Ok(Some(TransactionRecord {
        id,
        user_id: UserId::new(row.get("user_id")),
        wallet_id: WalletId::new(row.get("wallet_id")),
        tx_type,
        target,
        amount: parse_stored_decimal("transactions.amount", &amount)?,
        lzybra_borrowed: parse_stored_decimal("transactions.lzybra_borrowed", &lzybra_borrowed)?,
        status,
        error: row.get("error"),
        tx_hash: row.get("tx_hash"),
        time_ms: TimeMs::new(row.get("time_ms")),
    }))
}

fn collect_records(
    rows: &[sqlx::sqlite::SqliteRow],
) -> Result<Vec<TransactionRecord>, sqlx::Error> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(record) = row_to_record(row)? {
            records.push(record);
        }
    }
    Ok(records)
}

impl Repository {
    /// Insert a standalone ledger record (e.g., a failed entry recorded
    /// after the guarded commit could not go through).
    pub async fn insert_transaction(
        &self,
        record: &TransactionRecord,
    ) -> Result<(), sqlx::Error> {
        insert_transaction_stmt(record).execute(self.pool()).await?;
        Ok(())
    }

    /// A user's ledger, newest first, optionally scoped to one wallet.
    pub async fn list_transactions(
        &self,
        user_id: &UserId,
        wallet_id: Option<&WalletId>,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        let rows = match wallet_id {
            Some(wallet_id) => {
                sqlx::query(
                    r#"
                    SELECT * FROM transactions
                    WHERE user_id = ? AND wallet_id = ?
                    ORDER BY time_ms DESC, id DESC
                    "#,
                )
                .bind(user_id.as_str())
                .bind(wallet_id.as_str())
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT * FROM transactions WHERE user_id = ? ORDER BY time_ms DESC, id DESC",
                )
                .bind(user_id.as_str())
                .fetch_all(self.pool())
                .await?
            }
        };

        collect_records(&rows)
    }

    /// Completed deposit/withdraw entries for a user, in apply order.
    /// Failed entries never touched positions, so they are excluded.
    pub async fn list_completed_deposit_withdraw(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE user_id = ? AND status = 'completed' AND tx_type IN ('deposit', 'withdraw')
            ORDER BY time_ms ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(self.pool())
        .await?;

        collect_records(&rows)
    }

    /// Completed deposit/withdraw entries for a single wallet, in apply
    /// order. Source data for rebuilding the wallet's cached totals.
    pub async fn list_completed_for_wallet(
        &self,
        wallet_id: &WalletId,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE wallet_id = ? AND status = 'completed' AND tx_type IN ('deposit', 'withdraw')
            ORDER BY time_ms ASC, id ASC
            "#,
        )
        .bind(wallet_id.as_str())
        .fetch_all(self.pool())
        .await?;

        collect_records(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::{Decimal, Symbol};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn record(
        user_id: &UserId,
        wallet_id: &WalletId,
        tx_type: TxType,
        amount: &str,
    ) -> TransactionRecord {
        TransactionRecord::completed(
            user_id.clone(),
            wallet_id.clone(),
            tx_type,
            Target::Asset(Symbol::new("TSLA".to_string())),
            dec(amount),
            Decimal::zero(),
            None,
        )
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let (repo, _temp) = setup_test_db().await;
        let user_id = UserId::generate();
        let wallet_id = WalletId::generate();

        repo.insert_transaction(&record(&user_id, &wallet_id, TxType::Deposit, "100"))
            .await
            .unwrap();
        repo.insert_transaction(&record(&user_id, &wallet_id, TxType::Withdraw, "40"))
            .await
            .unwrap();

        let all = repo.list_transactions(&user_id, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped = repo
            .list_transactions(&user_id, Some(&wallet_id))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 2);

        let other = repo
            .list_transactions(&user_id, Some(&WalletId::generate()))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_completed_filter_excludes_failed() {
        let (repo, _temp) = setup_test_db().await;
        let user_id = UserId::generate();
        let wallet_id = WalletId::generate();

        repo.insert_transaction(&record(&user_id, &wallet_id, TxType::Deposit, "100"))
            .await
            .unwrap();
        repo.insert_transaction(&TransactionRecord::failed(
            user_id.clone(),
            wallet_id.clone(),
            TxType::Withdraw,
            Target::Asset(Symbol::new("TSLA".to_string())),
            dec("500"),
            Decimal::zero(),
            "insufficient balance".to_string(),
        ))
        .await
        .unwrap();

        let completed = repo
            .list_completed_deposit_withdraw(&user_id)
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].tx_type, TxType::Deposit);

        let for_wallet = repo.list_completed_for_wallet(&wallet_id).await.unwrap();
        assert_eq!(for_wallet.len(), 1);
    }
}
