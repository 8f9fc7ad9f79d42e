/// Session manager: orchestrates the credential and token lifecycle
use std::path::Path;
use std::sync::Arc;

use crate::{
    account::{store::NewAccountRecord, AccountStore, LoginOutcome, PublicAccount},
    blob_store::{BlobRef, BlobStore},
    error::{AppError, AppResult},
    password::PasswordHasher,
    token::{TokenIssuer, TokenPair},
    validation::FieldValidator,
};

/// Registration input, before hashing and normalization
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Orchestrates login, logout, refresh-token rotation, and profile updates
pub struct SessionManager {
    store: AccountStore,
    tokens: Arc<TokenIssuer>,
    blobs: Arc<dyn BlobStore>,
}

impl SessionManager {
    pub fn new(store: AccountStore, tokens: Arc<TokenIssuer>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            tokens,
            blobs,
        }
    }

    /// Register a new account
    ///
    /// The avatar is mandatory; the cover image is optional. Both blobs are
    /// uploaded before the account row is created.
    pub async fn register(
        &self,
        new: NewAccount,
        avatar: Option<&Path>,
        cover: Option<&Path>,
    ) -> AppResult<PublicAccount> {
        let mut fields = FieldValidator::new();
        fields
            .require("fullName", &new.full_name)
            .require_email("email", &new.email)
            .require("username", &new.username)
            .require("password", &new.password);
        fields.finish()?;

        let avatar_path =
            avatar.ok_or_else(|| AppError::Validation("Avatar image is required".to_string()))?;

        // Uploads are independent; run them concurrently when both present
        let (avatar_blob, cover_blob) = match cover {
            Some(cover_path) => {
                let (a, c) = tokio::join!(
                    self.upload_or_none(avatar_path),
                    self.upload_or_none(cover_path)
                );
                (a, c)
            }
            None => (self.upload_or_none(avatar_path).await, None),
        };

        // Upload failure means "no blob produced"; the avatar is mandatory
        let avatar_blob = avatar_blob
            .ok_or_else(|| AppError::Validation("Avatar image is required".to_string()))?;

        let password_hash = PasswordHasher::hash(&new.password)?;

        let created = self
            .store
            .create(NewAccountRecord {
                username: new.username,
                email: new.email,
                full_name: new.full_name,
                password_hash,
                avatar_url: Some(avatar_blob.url),
                cover_url: cover_blob.map(|b| b.url),
            })
            .await?;

        // Re-read what was just written; a miss here is a consistency
        // fault, not a 404
        let account = match self.store.find_by_id(&created.id).await {
            Ok(account) => account,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Internal(
                    "Account could not be read back after creation".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };

        tracing::info!(username = %account.username, "registered account");
        Ok(account.into())
    }

    /// Authenticate and mint a fresh token pair
    ///
    /// Persisting the refresh token is the rotation point: any previously
    /// issued refresh token for this account stops working here.
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<LoginOutcome> {
        if identifier.trim().is_empty() {
            return Err(AppError::Validation(
                "Username or email is required".to_string(),
            ));
        }

        let account = self.store.find_by_username_or_email(identifier).await?;

        if !PasswordHasher::verify(password, &account.password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid account credentials".to_string(),
            ));
        }

        let pair = self.tokens.issue_pair(&account)?;
        self.store
            .update_refresh_token(&account.id, Some(&pair.refresh_token))
            .await?;

        tracing::info!(username = %account.username, "login succeeded");
        Ok(LoginOutcome {
            account: account.into(),
            tokens: pair,
        })
    }

    /// Clear the persisted refresh token, ending the session
    pub async fn logout(&self, account_id: &str) -> AppResult<()> {
        self.store.update_refresh_token(account_id, None).await
    }

    /// Rotate the token pair
    ///
    /// The incoming token must match the account's currently persisted
    /// refresh token exactly; a token rotated away earlier is permanently
    /// unusable even if its signature and expiry still check out. Replay
    /// is rejected without touching the stored token.
    pub async fn refresh(&self, incoming: Option<&str>) -> AppResult<TokenPair> {
        let token = incoming
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Refresh token missing".to_string()))?;

        let claims = self.tokens.verify_refresh_token(token)?;

        let account = match self.store.find_by_id(&claims.sub).await {
            Ok(account) => account,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Unauthorized(
                    "Account no longer exists".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };

        if account.refresh_token.as_deref() != Some(token) {
            tracing::warn!(username = %account.username, "rejected replayed refresh token");
            return Err(AppError::Unauthorized(
                "Refresh token has been rotated or revoked".to_string(),
            ));
        }

        let pair = self.tokens.issue_pair(&account)?;

        // Conditional swap: if a concurrent refresh rotated first, this
        // call loses and its caller must log in again
        let rotated = self
            .store
            .rotate_refresh_token(&account.id, token, &pair.refresh_token)
            .await?;
        if !rotated {
            return Err(AppError::Unauthorized(
                "Refresh token has been rotated or revoked".to_string(),
            ));
        }

        Ok(pair)
    }

    /// Change the account password after verifying the old one
    pub async fn change_password(
        &self,
        account_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let mut fields = FieldValidator::new();
        fields.require("newPassword", new_password);
        fields.finish()?;

        let account = self.store.find_by_id(account_id).await?;

        if !PasswordHasher::verify(old_password, &account.password_hash)? {
            return Err(AppError::Unauthorized(
                "Old password is incorrect".to_string(),
            ));
        }

        let hash = PasswordHasher::hash(new_password)?;
        self.store.update_password_hash(account_id, &hash).await
    }

    /// Stripped view of the calling account
    pub async fn current_account(&self, account_id: &str) -> AppResult<PublicAccount> {
        Ok(self.store.find_by_id(account_id).await?.into())
    }

    /// Update full name and email
    pub async fn update_profile(
        &self,
        account_id: &str,
        full_name: &str,
        email: &str,
    ) -> AppResult<PublicAccount> {
        let mut fields = FieldValidator::new();
        fields
            .require("fullName", full_name)
            .require_email("email", email);
        fields.finish()?;

        self.store
            .update_profile_fields(account_id, full_name, email)
            .await
    }

    /// Replace the avatar image
    pub async fn update_avatar(
        &self,
        account_id: &str,
        file: Option<&Path>,
    ) -> AppResult<PublicAccount> {
        let path =
            file.ok_or_else(|| AppError::Validation("Avatar image is required".to_string()))?;

        let blob = self
            .upload_or_none(path)
            .await
            .ok_or_else(|| AppError::Validation("Avatar image is required".to_string()))?;

        self.store.update_avatar_url(account_id, &blob.url).await
    }

    /// Replace the cover image
    pub async fn update_cover_image(
        &self,
        account_id: &str,
        file: Option<&Path>,
    ) -> AppResult<PublicAccount> {
        let path =
            file.ok_or_else(|| AppError::Validation("Cover image is required".to_string()))?;

        let blob = self.blobs.upload(path).await?;
        self.store.update_cover_url(account_id, &blob.url).await
    }

    async fn upload_or_none(&self, path: &Path) -> Option<BlobRef> {
        match self.blobs.upload(path).await {
            Ok(blob) => Some(blob),
            Err(e) => {
                tracing::warn!("blob upload failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blob_store::BlobRef, config::TokenConfig, db};
    use async_trait::async_trait;

    struct StaticBlobStore;

    #[async_trait]
    impl BlobStore for StaticBlobStore {
        async fn upload(&self, local_path: &Path) -> AppResult<BlobRef> {
            let name = local_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("blob");
            Ok(BlobRef {
                url: format!("https://cdn.test/media/{}", name),
            })
        }
    }

    struct FailingBlobStore;

    #[async_trait]
    impl BlobStore for FailingBlobStore {
        async fn upload(&self, _local_path: &Path) -> AppResult<BlobRef> {
            Err(AppError::BlobStorage("upstream unavailable".to_string()))
        }
    }

    fn token_issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(TokenConfig {
            access_secret: "access-secret-a".to_string(),
            refresh_secret: "refresh-secret-b".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 864000,
        }))
    }

    async fn manager() -> (SessionManager, Arc<TokenIssuer>) {
        let pool = db::memory_pool().await;
        let issuer = token_issuer();
        let manager = SessionManager::new(
            AccountStore::new(pool),
            Arc::clone(&issuer),
            Arc::new(StaticBlobStore),
        );
        (manager, issuer)
    }

    fn alice() -> NewAccount {
        NewAccount {
            full_name: "Alice Example".to_string(),
            email: "Alice@Example.com".to_string(),
            username: "Alice".to_string(),
            password: "hunter2hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_returns_stripped_view() {
        let (manager, _) = manager().await;
        let view = manager
            .register(alice(), Some(Path::new("avatar.png")), None)
            .await
            .unwrap();

        assert_eq!(view.username, "alice");
        assert_eq!(view.email, "alice@example.com");
        assert_eq!(
            view.avatar_url.as_deref(),
            Some("https://cdn.test/media/avatar.png")
        );
        assert!(view.cover_url.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshToken").is_none());
    }

    #[tokio::test]
    async fn test_register_reports_all_blank_fields() {
        let (manager, _) = manager().await;
        let blank = NewAccount {
            full_name: " ".to_string(),
            email: String::new(),
            username: String::new(),
            password: String::new(),
        };

        match manager
            .register(blank, Some(Path::new("avatar.png")), None)
            .await
        {
            Err(AppError::FieldValidation(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected field validation, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_register_requires_avatar() {
        let (manager, _) = manager().await;
        assert!(matches!(
            manager.register(alice(), None, None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_avatar_upload_failure_is_validation() {
        let pool = db::memory_pool().await;
        let manager = SessionManager::new(
            AccountStore::new(pool),
            token_issuer(),
            Arc::new(FailingBlobStore),
        );

        assert!(matches!(
            manager
                .register(alice(), Some(Path::new("avatar.png")), None)
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_same_username_twice_is_conflict() {
        let (manager, _) = manager().await;
        manager
            .register(alice(), Some(Path::new("a.png")), None)
            .await
            .unwrap();

        let mut dup = alice();
        dup.email = "elsewhere@example.com".to_string();
        assert!(matches!(
            manager.register(dup, Some(Path::new("a.png")), None).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_mints_verifiable_pair() {
        let (manager, issuer) = manager().await;
        manager
            .register(alice(), Some(Path::new("a.png")), None)
            .await
            .unwrap();

        let outcome = manager.login("alice", "hunter2hunter2").await.unwrap();

        let access = issuer
            .verify_access_token(&outcome.tokens.access_token)
            .unwrap();
        assert_eq!(access.username, "alice");
        assert_eq!(access.email, "alice@example.com");

        let refresh = issuer
            .verify_refresh_token(&outcome.tokens.refresh_token)
            .unwrap();
        assert_eq!(refresh.sub, outcome.account.id);
        assert_ne!(outcome.tokens.access_token, outcome.tokens.refresh_token);
    }

    #[tokio::test]
    async fn test_login_by_email_works() {
        let (manager, _) = manager().await;
        manager
            .register(alice(), Some(Path::new("a.png")), None)
            .await
            .unwrap();

        assert!(manager
            .login("alice@example.com", "hunter2hunter2")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (manager, _) = manager().await;
        manager
            .register(alice(), Some(Path::new("a.png")), None)
            .await
            .unwrap();

        assert!(matches!(
            manager.login("  ", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.login("nobody", "pw").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager.login("alice", "wrong password").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotation_rejects_replay() {
        let (manager, _) = manager().await;
        manager
            .register(alice(), Some(Path::new("a.png")), None)
            .await
            .unwrap();

        let outcome = manager.login("alice", "hunter2hunter2").await.unwrap();
        let token_x = outcome.tokens.refresh_token;

        // First rotation succeeds and yields a new pair
        let pair_y = manager.refresh(Some(&token_x)).await.unwrap();
        assert_ne!(pair_y.refresh_token, token_x);

        // The rotated-away token is permanently dead
        assert!(matches!(
            manager.refresh(Some(&token_x)).await,
            Err(AppError::Unauthorized(_))
        ));

        // The freshly issued token still works
        assert!(manager.refresh(Some(&pair_y.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_requires_a_token() {
        let (manager, _) = manager().await;
        assert!(matches!(
            manager.refresh(None).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            manager.refresh(Some("  ")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            manager.refresh(Some("not-a-jwt")).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_token() {
        let (manager, _) = manager().await;
        manager
            .register(alice(), Some(Path::new("a.png")), None)
            .await
            .unwrap();

        let outcome = manager.login("alice", "hunter2hunter2").await.unwrap();
        manager.logout(&outcome.account.id).await.unwrap();

        // A signed, unexpired token is still rejected once cleared
        assert!(matches!(
            manager.refresh(Some(&outcome.tokens.refresh_token)).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password_lifecycle() {
        let (manager, _) = manager().await;
        manager
            .register(alice(), Some(Path::new("a.png")), None)
            .await
            .unwrap();
        let outcome = manager.login("alice", "hunter2hunter2").await.unwrap();
        let id = outcome.account.id;

        // Wrong old password is rejected
        assert!(matches!(
            manager.change_password(&id, "wrong", "newpassword1").await,
            Err(AppError::Unauthorized(_))
        ));

        manager
            .change_password(&id, "hunter2hunter2", "newpassword1")
            .await
            .unwrap();

        assert!(matches!(
            manager.login("alice", "hunter2hunter2").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(manager.login("alice", "newpassword1").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_and_avatar() {
        let (manager, _) = manager().await;
        let view = manager
            .register(alice(), Some(Path::new("a.png")), None)
            .await
            .unwrap();

        let updated = manager
            .update_profile(&view.id, "Alice Renamed", "renamed@example.com")
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Alice Renamed");
        assert_eq!(updated.email, "renamed@example.com");

        let updated = manager
            .update_avatar(&view.id, Some(Path::new("new-avatar.png")))
            .await
            .unwrap();
        assert_eq!(
            updated.avatar_url.as_deref(),
            Some("https://cdn.test/media/new-avatar.png")
        );

        assert!(matches!(
            manager.update_avatar(&view.id, None).await,
            Err(AppError::Validation(_))
        ));
    }
}
