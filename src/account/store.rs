/// Credential store: persistence for account records
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    account::PublicAccount,
    db::models::Account,
    error::{AppError, AppResult},
};

const ACCOUNT_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar_url, \
     cover_url, refresh_token, created_at, updated_at";

/// New account to persist; the password is already hashed by the caller
#[derive(Debug, Clone)]
pub struct NewAccountRecord {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
}

/// Typed access to the account table
#[derive(Clone)]
pub struct AccountStore {
    db: SqlitePool,
}

impl AccountStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create an account; Conflict if the username or email is taken
    pub async fn create(&self, record: NewAccountRecord) -> AppResult<Account> {
        let username = record.username.trim().to_lowercase();
        let email = record.email.trim().to_lowercase();

        if self.identifier_taken(&username, &email).await? {
            return Err(AppError::Conflict(
                "An account with this username or email already exists".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO account (id, username, email, full_name, password_hash, avatar_url, cover_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&id)
        .bind(&username)
        .bind(&email)
        .bind(record.full_name.trim())
        .bind(&record.password_hash)
        .bind(&record.avatar_url)
        .bind(&record.cover_url)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            // Lost the race against a concurrent create
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(
                    "An account with this username or email already exists".to_string(),
                )
            }
            other => AppError::Database(other),
        })?;

        Ok(Account {
            id,
            username,
            email,
            full_name: record.full_name.trim().to_string(),
            password_hash: record.password_hash,
            avatar_url: record.avatar_url,
            cover_url: record.cover_url,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get an account by id
    pub async fn find_by_id(&self, id: &str) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Get an account by username, case-insensitively
    pub async fn find_by_username(&self, username: &str) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE username = ?1"
        ))
        .bind(username.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Find an account by username or email (authentication read; includes
    /// the password hash)
    pub async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Account> {
        let identifier = identifier.trim().to_lowercase();

        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE username = ?1 OR email = ?1"
        ))
        .bind(&identifier)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Check whether a username or email is already registered
    pub async fn identifier_taken(&self, username: &str, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM account WHERE username = ?1 OR email = ?2",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(count > 0)
    }

    /// Set or clear the persisted refresh token
    pub async fn update_refresh_token(&self, id: &str, token: Option<&str>) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE account SET refresh_token = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(token)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// Atomically swap the refresh token, but only if the stored value still
    /// equals `current`. Returns false when a concurrent rotation won.
    pub async fn rotate_refresh_token(
        &self,
        id: &str,
        current: &str,
        next: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE account SET refresh_token = ?3, updated_at = ?4
             WHERE id = ?1 AND refresh_token = ?2",
        )
        .bind(id)
        .bind(current)
        .bind(next)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() == 1)
    }

    /// Replace the stored password hash
    pub async fn update_password_hash(&self, id: &str, hash: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE account SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(hash)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// Update full name and email, returning the stripped view
    pub async fn update_profile_fields(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
    ) -> AppResult<PublicAccount> {
        sqlx::query("UPDATE account SET full_name = ?2, email = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(id)
            .bind(full_name.trim())
            .bind(email.trim().to_lowercase())
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("Email already in use".to_string())
                }
                other => AppError::Database(other),
            })?;

        Ok(self.find_by_id(id).await?.into())
    }

    /// Update the avatar URL, returning the stripped view
    pub async fn update_avatar_url(&self, id: &str, url: &str) -> AppResult<PublicAccount> {
        sqlx::query("UPDATE account SET avatar_url = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(url)
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        Ok(self.find_by_id(id).await?.into())
    }

    /// Update the cover image URL, returning the stripped view
    pub async fn update_cover_url(&self, id: &str, url: &str) -> AppResult<PublicAccount> {
        sqlx::query("UPDATE account SET cover_url = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(url)
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        Ok(self.find_by_id(id).await?.into())
    }

    /// Record a watch, moving the video to the front of the history
    pub async fn record_watch(&self, account_id: &str, video_id: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO watch_history (account_id, video_id, watched_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (account_id, video_id) DO UPDATE SET watched_at = excluded.watched_at",
        )
        .bind(account_id)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn alice() -> NewAccountRecord {
        NewAccountRecord {
            username: "Alice".to_string(),
            email: "Alice@Example.com".to_string(),
            full_name: "Alice Example".to_string(),
            password_hash: "$argon2id$stub-hash".to_string(),
            avatar_url: Some("https://cdn.example/a.png".to_string()),
            cover_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_username_and_email() {
        let store = AccountStore::new(db::memory_pool().await);
        let account = store.create(alice()).await.unwrap();

        assert_eq!(account.username, "alice");
        assert_eq!(account.email, "alice@example.com");
        assert!(account.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let store = AccountStore::new(db::memory_pool().await);
        store.create(alice()).await.unwrap();

        let mut dup = alice();
        dup.email = "other@example.com".to_string();
        match store.create(dup).await {
            Err(AppError::Conflict(_)) => {}
            other => panic!("expected conflict, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = AccountStore::new(db::memory_pool().await);
        store.create(alice()).await.unwrap();

        let mut dup = alice();
        dup.username = "someoneelse".to_string();
        assert!(matches!(
            store.create(dup).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_identifier_matches_username_or_email() {
        let store = AccountStore::new(db::memory_pool().await);
        let created = store.create(alice()).await.unwrap();

        let by_username = store.find_by_username_or_email("ALICE").await.unwrap();
        let by_email = store
            .find_by_username_or_email("alice@example.com")
            .await
            .unwrap();

        assert_eq!(by_username.id, created.id);
        assert_eq!(by_email.id, created.id);
        assert!(matches!(
            store.find_by_username_or_email("nobody").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rotate_refresh_token_is_conditional() {
        let store = AccountStore::new(db::memory_pool().await);
        let account = store.create(alice()).await.unwrap();

        store
            .update_refresh_token(&account.id, Some("token-x"))
            .await
            .unwrap();

        // Swap succeeds while the stored value matches
        assert!(store
            .rotate_refresh_token(&account.id, "token-x", "token-y")
            .await
            .unwrap());

        // A second swap from the stale value fails
        assert!(!store
            .rotate_refresh_token(&account.id, "token-x", "token-z")
            .await
            .unwrap());

        let account = store.find_by_id(&account.id).await.unwrap();
        assert_eq!(account.refresh_token.as_deref(), Some("token-y"));
    }

    #[tokio::test]
    async fn test_clear_refresh_token() {
        let store = AccountStore::new(db::memory_pool().await);
        let account = store.create(alice()).await.unwrap();

        store
            .update_refresh_token(&account.id, Some("token-x"))
            .await
            .unwrap();
        store.update_refresh_token(&account.id, None).await.unwrap();

        let account = store.find_by_id(&account.id).await.unwrap();
        assert!(account.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_update_profile_returns_stripped_view() {
        let store = AccountStore::new(db::memory_pool().await);
        let account = store.create(alice()).await.unwrap();

        let view = store
            .update_profile_fields(&account.id, "Alice B. Example", "ALICE@new.example")
            .await
            .unwrap();

        assert_eq!(view.full_name, "Alice B. Example");
        assert_eq!(view.email, "alice@new.example");

        // The projection serializes without credential material
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refreshToken").is_none());
    }
}
