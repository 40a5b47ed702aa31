//! User account and KYC persistence.

use sqlx::Row;

use super::Repository;
use crate::domain::{KycDetails, KycStatus, TimeMs, User, UserId};

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> User {
    let kyc_status_str: String = row.get("kyc_status");
    let kyc_status = KycStatus::parse(&kyc_status_str).unwrap_or(KycStatus::Pending);

    let document_type: Option<String> = row.get("kyc_document_type");
    let kyc_details = document_type.map(|document_type| KycDetails {
        document_type,
        document_number: row.get("kyc_document_number"),
        document_image: row.get("kyc_document_image"),
        submitted_at: TimeMs::new(row.get("kyc_submitted_at_ms")),
        approved_at: row
            .get::<Option<i64>, _>("kyc_approved_at_ms")
            .map(TimeMs::new),
    });

    User {
        id: UserId::new(row.get("id")),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        kyc_status,
        kyc_details,
        created_at: TimeMs::new(row.get("created_at_ms")),
        updated_at: TimeMs::new(row.get("updated_at_ms")),
    }
}

impl Repository {
    /// Insert a new user.
    ///
    /// # Errors
    /// Returns a unique-violation error if the email is already registered.
    pub async fn insert_user(&self, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, kyc_status, created_at_ms, updated_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.first_name)
        .bind(user.last_name.as_deref())
        .bind(&user.email)
        .bind(user.kyc_status.as_str())
        .bind(user.created_at.as_ms())
        .bind(user.updated_at.as_ms())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.as_str())
            .fetch_optional(self.pool())
            .await?;

        Ok(row.as_ref().map(row_to_user))
    }

    /// Update profile fields, leaving unspecified ones unchanged.
    ///
    /// `last_name` is optional on the row, so its parameter is doubled:
    /// `None` leaves it alone, `Some(None)` clears it.
    pub async fn update_user_profile(
        &self,
        user_id: &UserId,
        first_name: Option<&str>,
        last_name: Option<Option<&str>>,
    ) -> Result<Option<User>, sqlx::Error> {
        let Some(current) = self.get_user(user_id).await? else {
            return Ok(None);
        };

        let first_name = first_name.unwrap_or(&current.first_name);
        let last_name = match last_name {
            Some(value) => value,
            None => current.last_name.as_deref(),
        };

        sqlx::query(
            "UPDATE users SET first_name = ?, last_name = ?, updated_at_ms = ? WHERE id = ?",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(TimeMs::now().as_ms())
        .bind(user_id.as_str())
        .execute(self.pool())
        .await?;

        self.get_user(user_id).await
    }

    /// Store submitted KYC documents and reset status to pending.
    pub async fn submit_kyc(
        &self,
        user_id: &UserId,
        details: &KycDetails,
    ) -> Result<Option<User>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                kyc_status = 'pending',
                kyc_document_type = ?,
                kyc_document_number = ?,
                kyc_document_image = ?,
                kyc_submitted_at_ms = ?,
                kyc_approved_at_ms = NULL,
                updated_at_ms = ?
            WHERE id = ?
            "#,
        )
        .bind(&details.document_type)
        .bind(&details.document_number)
        .bind(&details.document_image)
        .bind(details.submitted_at.as_ms())
        .bind(TimeMs::now().as_ms())
        .bind(user_id.as_str())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(user_id).await
    }

    /// Transition KYC status; approval stamps `approved_at`.
    pub async fn set_kyc_status(
        &self,
        user_id: &UserId,
        status: KycStatus,
    ) -> Result<Option<User>, sqlx::Error> {
        let approved_at_ms = if status == KycStatus::Approved {
            Some(TimeMs::now().as_ms())
        } else {
            None
        };

        let result = sqlx::query(
            r#"
            UPDATE users SET kyc_status = ?, kyc_approved_at_ms = ?, updated_at_ms = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(approved_at_ms)
        .bind(TimeMs::now().as_ms())
        .bind(user_id.as_str())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::is_unique_violation;
    use crate::db::repo::test_support::setup_test_db;

    fn make_user(email: &str) -> User {
        User {
            id: UserId::generate(),
            first_name: "Ada".to_string(),
            last_name: Some("Lovelace".to_string()),
            email: email.to_string(),
            kyc_status: KycStatus::Pending,
            kyc_details: None,
            created_at: TimeMs::now(),
            updated_at: TimeMs::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_user() {
        let (repo, _temp) = setup_test_db().await;
        let user = make_user("ada@example.com");

        repo.insert_user(&user).await.unwrap();
        let fetched = repo.get_user(&user.id).await.unwrap().unwrap();

        assert_eq!(fetched.email, "ada@example.com");
        assert_eq!(fetched.kyc_status, KycStatus::Pending);
        assert!(fetched.kyc_details.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_user(&make_user("dup@example.com"))
            .await
            .unwrap();

        let err = repo
            .insert_user(&make_user("dup@example.com"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let (repo, _temp) = setup_test_db().await;
        let user = make_user("ada@example.com");
        repo.insert_user(&user).await.unwrap();

        let updated = repo
            .update_user_profile(&user.id, Some("Augusta"), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.first_name, "Augusta");
        assert_eq!(updated.last_name.as_deref(), Some("Lovelace"));
    }

    #[tokio::test]
    async fn test_update_profile_clears_last_name() {
        let (repo, _temp) = setup_test_db().await;
        let user = make_user("ada@example.com");
        repo.insert_user(&user).await.unwrap();

        let updated = repo
            .update_user_profile(&user.id, None, Some(None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.first_name, "Ada");
        assert!(updated.last_name.is_none());
    }

    #[tokio::test]
    async fn test_kyc_submit_and_approve() {
        let (repo, _temp) = setup_test_db().await;
        let user = make_user("kyc@example.com");
        repo.insert_user(&user).await.unwrap();

        let details = KycDetails {
            document_type: "passport".to_string(),
            document_number: "P1234567".to_string(),
            document_image: "/docs/p.png".to_string(),
            submitted_at: TimeMs::now(),
            approved_at: None,
        };
        let submitted = repo.submit_kyc(&user.id, &details).await.unwrap().unwrap();
        assert_eq!(submitted.kyc_status, KycStatus::Pending);
        assert_eq!(
            submitted.kyc_details.as_ref().unwrap().document_number,
            "P1234567"
        );

        let approved = repo
            .set_kyc_status(&user.id, KycStatus::Approved)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approved.kyc_status, KycStatus::Approved);
        assert!(approved.kyc_details.unwrap().approved_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_user_returns_none() {
        let (repo, _temp) = setup_test_db().await;
        let missing = UserId::generate();
        assert!(repo.get_user(&missing).await.unwrap().is_none());
        assert!(repo
            .update_user_profile(&missing, Some("x"), None)
            .await
            .unwrap()
            .is_none());
    }
}
