//! Asset and pool catalog persistence.

use sqlx::Row;

use super::Repository;
use crate::domain::{Asset, Pool, PoolAddress, PriceFeeds, Symbol, TimeMs};

fn row_to_asset(row: &sqlx::sqlite::SqliteRow) -> Asset {
    Asset {
        symbol: Symbol::new(row.get("symbol")),
        name: row.get("name"),
        image: row.get("image"),
        price_feeds: PriceFeeds {
            chainlink: row.get("chainlink_feed"),
            pyth: row.get("pyth_feed"),
        },
        created_at: TimeMs::new(row.get("created_at_ms")),
    }
}

fn row_to_pool(row: &sqlx::sqlite::SqliteRow) -> Pool {
    Pool {
        pool_address: PoolAddress::new(row.get("pool_address")),
        name: row.get("name"),
        description: row.get("description"),
        image: row.get("image"),
        created_at: TimeMs::new(row.get("created_at_ms")),
    }
}

impl Repository {
    pub async fn insert_asset(&self, asset: &Asset) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO assets (symbol, name, image, chainlink_feed, pyth_feed, created_at_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.symbol.as_str())
        .bind(&asset.name)
        .bind(&asset.image)
        .bind(asset.price_feeds.chainlink.as_deref())
        .bind(asset.price_feeds.pyth.as_deref())
        .bind(asset.created_at.as_ms())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn get_asset(&self, symbol: &Symbol) -> Result<Option<Asset>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM assets WHERE symbol = ?")
            .bind(symbol.as_str())
            .fetch_optional(self.pool())
            .await?;
        Ok(row.as_ref().map(row_to_asset))
    }

    /// Update mutable asset attributes; the symbol is immutable identity.
    pub async fn update_asset(&self, asset: &Asset) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE assets SET name = ?, image = ?, chainlink_feed = ?, pyth_feed = ?
            WHERE symbol = ?
            "#,
        )
        .bind(&asset.name)
        .bind(&asset.image)
        .bind(asset.price_feeds.chainlink.as_deref())
        .bind(asset.price_feeds.pyth.as_deref())
        .bind(asset.symbol.as_str())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_asset(&self, symbol: &Symbol) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM assets WHERE symbol = ?")
            .bind(symbol.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_pool(&self, pool: &Pool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO pools (pool_address, name, description, image, created_at_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(pool.pool_address.as_str())
        .bind(&pool.name)
        .bind(&pool.description)
        .bind(&pool.image)
        .bind(pool.created_at.as_ms())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn get_pool(&self, address: &PoolAddress) -> Result<Option<Pool>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM pools WHERE pool_address = ?")
            .bind(address.as_str())
            .fetch_optional(self.pool())
            .await?;
        Ok(row.as_ref().map(row_to_pool))
    }

    pub async fn update_pool(&self, pool: &Pool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE pools SET name = ?, description = ?, image = ?
            WHERE pool_address = ?
            "#,
        )
        .bind(&pool.name)
        .bind(&pool.description)
        .bind(&pool.image)
        .bind(pool.pool_address.as_str())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_pool(&self, address: &PoolAddress) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pools WHERE pool_address = ?")
            .bind(address.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::is_unique_violation;
    use crate::db::repo::test_support::setup_test_db;

    fn make_asset(symbol: &str) -> Asset {
        Asset {
            symbol: Symbol::new(symbol.to_string()),
            name: symbol.to_string(),
            image: format!("{}.png", symbol),
            price_feeds: PriceFeeds {
                chainlink: Some(format!("cl-{}", symbol)),
                pyth: None,
            },
            created_at: TimeMs::now(),
        }
    }

    fn make_pool(address: &str) -> Pool {
        Pool {
            pool_address: PoolAddress::new(address.to_string()),
            name: "Stable pool".to_string(),
            description: "USD stables".to_string(),
            image: "pool.png".to_string(),
            created_at: TimeMs::now(),
        }
    }

    #[tokio::test]
    async fn test_asset_crud() {
        let (repo, _temp) = setup_test_db().await;
        let mut asset = make_asset("TSLA");
        repo.insert_asset(&asset).await.unwrap();

        let fetched = repo.get_asset(&asset.symbol).await.unwrap().unwrap();
        assert_eq!(fetched.price_feeds.chainlink.as_deref(), Some("cl-TSLA"));

        asset.price_feeds.pyth = Some("pyth-TSLA".to_string());
        assert!(repo.update_asset(&asset).await.unwrap());
        let fetched = repo.get_asset(&asset.symbol).await.unwrap().unwrap();
        assert_eq!(fetched.price_feeds.pyth.as_deref(), Some("pyth-TSLA"));

        assert!(repo.delete_asset(&asset.symbol).await.unwrap());
        assert!(repo.get_asset(&asset.symbol).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_symbol_is_unique_violation() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_asset(&make_asset("TSLA")).await.unwrap();
        let err = repo.insert_asset(&make_asset("TSLA")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_pool_crud() {
        let (repo, _temp) = setup_test_db().await;
        let mut pool = make_pool("0xpool");
        repo.insert_pool(&pool).await.unwrap();

        pool.description = "Rebalanced".to_string();
        assert!(repo.update_pool(&pool).await.unwrap());
        let fetched = repo.get_pool(&pool.pool_address).await.unwrap().unwrap();
        assert_eq!(fetched.description, "Rebalanced");

        assert!(repo.delete_pool(&pool.pool_address).await.unwrap());
        assert!(repo.get_pool(&pool.pool_address).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_rows_return_false() {
        let (repo, _temp) = setup_test_db().await;
        assert!(!repo.update_asset(&make_asset("GHOST")).await.unwrap());
        assert!(!repo.delete_pool(&PoolAddress::new("0xghost".into())).await.unwrap());
    }
}
